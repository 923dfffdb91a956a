//! HTTP-to-RPC adapter surface.
//!
//! The gateway sits between an HTTP route and the greeter client: it takes
//! the name extracted from a request path and produces the plain-text body
//! the route should answer with. HTTP routing and request parsing themselves
//! live outside this crate.

use tracing::info;

use crate::{
    config::Jitter,
    greeter::{GreeterClient, HelloRequest},
};

/// Forwards greet requests to the greeter service and renders the outcome as
/// a plain-text response body.
#[derive(Debug)]
pub struct GreetGateway {
    client: GreeterClient,
    jitter: Jitter,
}

impl GreetGateway {
    /// A gateway that forwards immediately.
    pub fn new(client: GreeterClient) -> Self {
        Self {
            client,
            jitter: Jitter::none(),
        }
    }

    /// A gateway that sleeps a random delay before forwarding, simulating
    /// client-side think time. Independent of the server's own delay.
    pub fn with_jitter(client: GreeterClient, jitter: Jitter) -> Self {
        Self { client, jitter }
    }

    /// Greets `name` over RPC and returns the response body.
    ///
    /// On success the body is the reply message plus a trailing newline. On
    /// failure it reports the error's detail string and code verbatim; the
    /// failure is isolated to this call and never retried.
    pub async fn greet(&self, name: &str) -> String {
        self.jitter.sleep().await;
        let request = HelloRequest {
            name: name.to_string(),
        };
        match self.client.say_hello(request).await {
            Ok(reply) => {
                info!(name, "rpc SayHello");
                format!("{}\n", reply.message)
            }
            Err(e) => format!("rpc SayHello, error: {}, Error code: {}", e, e.code()),
        }
    }
}
