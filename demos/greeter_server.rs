//! Greeter server listening on the well-known port.

use std::{error::Error, result, time::Duration};

use greetrpc::{Greeter, Jitter, Server, ServerConfig};

#[tokio::main]
async fn main() -> result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::default();
    // Simulated variable processing latency.
    let service = Greeter::with_jitter(Jitter::uniform(Duration::from_millis(1000)));
    let server = Server::new(service).tcp(&config.bind).await?;
    println!("Greeter listening on {}", config.bind);
    server.run().await?;
    Ok(())
}
