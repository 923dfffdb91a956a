//! The greeter service contract: message types, the server-side handler, and
//! the client stub.

use async_trait::async_trait;
use rmpv::Value;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::{ClientConfig, Jitter},
    connection::Handler,
    error::{ErrorCode, Result, RpcError},
    message::{from_wire, to_wire},
    transport::Client,
};

/// Method name of the single unary RPC exposed by the greeter service.
pub const SAY_HELLO: &str = "SayHello";

/// The request message: the name to greet. Created by the caller per call and
/// discarded once the call completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloRequest {
    pub name: String,
}

/// The reply message: the greeting produced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloReply {
    pub message: String,
}

/// Server-side implementation of the greeter service.
///
/// `SayHello` always succeeds: for any name, including the empty string, the
/// reply message is `"Hello "` followed by the name verbatim.
#[derive(Debug, Clone, Default)]
pub struct Greeter {
    jitter: Jitter,
}

impl Greeter {
    /// A greeter that replies without artificial delay.
    pub fn new() -> Self {
        Self {
            jitter: Jitter::none(),
        }
    }

    /// A greeter that sleeps a random delay before each reply, simulating
    /// variable processing latency.
    pub fn with_jitter(jitter: Jitter) -> Self {
        Self { jitter }
    }

    async fn say_hello(&self, request: HelloRequest) -> HelloReply {
        self.jitter.sleep().await;
        info!(name = %request.name, "rpc SayHello");
        HelloReply {
            message: format!("Hello {}", request.name),
        }
    }
}

#[async_trait]
impl Handler for Greeter {
    async fn handle(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            SAY_HELLO => {
                let request: HelloRequest = from_wire(&params)?;
                to_wire(&self.say_hello(request).await)
            }
            _ => Err(RpcError::Remote {
                code: ErrorCode::Unimplemented,
                detail: format!("method '{}' is not implemented", method),
            }),
        }
    }
}

/// Client stub for the greeter service.
///
/// Wraps one explicitly owned connection, created at startup and reused for
/// every call in the process. No retries, no deadline overrides: the call
/// future resolves with exactly one of the reply or a transport error.
#[derive(Debug)]
pub struct GreeterClient {
    client: Client,
}

impl GreeterClient {
    /// Connects to the target address in `config`.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let client = Client::connect_tcp(&config.target).await?;
        Ok(Self { client })
    }

    /// Invokes `SayHello` and waits for the reply.
    pub async fn say_hello(&self, request: HelloRequest) -> Result<HelloReply> {
        self.client.call(SAY_HELLO, &request).await
    }
}
