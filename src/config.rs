//! Explicit, immutable configuration values.
//!
//! Configuration is constructed once at startup and passed to the component
//! that needs it; nothing here is global or mutable after construction.

use std::time::Duration;

use rand::Rng;

/// Well-known port the greeter service listens on.
pub const DEFAULT_PORT: u16 = 50051;

/// Server-side configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind: String,
}

impl Default for ServerConfig {
    /// Binds the wildcard address on the well-known port.
    fn default() -> Self {
        Self {
            bind: format!("[::]:{}", DEFAULT_PORT),
        }
    }
}

/// Client-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the greeter server.
    pub target: String,
}

impl ClientConfig {
    /// Overrides the target address.
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for ClientConfig {
    /// Targets the loopback equivalent of the default bind address.
    fn default() -> Self {
        Self {
            target: format!("localhost:{}", DEFAULT_PORT),
        }
    }
}

/// Optional simulated-latency hook.
///
/// The demo binaries enable this on both the server handler and the gateway
/// to mimic variable processing latency and client-side think time; it is not
/// load-bearing and defaults to off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jitter {
    /// Exclusive upper bound of the random delay, if enabled.
    bound: Option<Duration>,
}

impl Jitter {
    /// No delay.
    pub fn none() -> Self {
        Self { bound: None }
    }

    /// Sleeps a uniform random duration in `[0, bound)` at each call site.
    pub fn uniform(bound: Duration) -> Self {
        Self { bound: Some(bound) }
    }

    /// Waits out the configured delay, or returns immediately if disabled.
    pub async fn sleep(&self) {
        if let Some(bound) = self.bound {
            if !bound.is_zero() {
                let delay = rand::rng().random_range(Duration::ZERO..bound);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_disabled_jitter_returns_immediately() {
        let start = Instant::now();
        Jitter::none().sleep().await;
        Jitter::default().sleep().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_uniform_jitter_is_bounded() {
        let jitter = Jitter::uniform(Duration::from_millis(20));
        for _ in 0..5 {
            let start = Instant::now();
            jitter.sleep().await;
            // Scheduling slack on top of the configured bound.
            assert!(start.elapsed() < Duration::from_millis(500));
        }
    }

    #[test]
    fn test_default_addresses_share_the_well_known_port() {
        assert!(ServerConfig::default().bind.ends_with(":50051"));
        assert!(ClientConfig::default().target.ends_with(":50051"));
        assert_eq!(ClientConfig::with_target("[::1]:4000").target, "[::1]:4000");
    }
}
