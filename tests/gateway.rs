//! Integration tests for the HTTP-side gateway.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use greetrpc::{
    ClientConfig, ErrorCode, GreetGateway, Greeter, GreeterClient, Handler, Jitter, Result,
    RpcError, Server, Value,
};

/// A service that answers nothing, for exercising the gateway error path.
#[derive(Clone, Default)]
struct EmptyService;

#[async_trait]
impl Handler for EmptyService {
    async fn handle(&self, method: &str, _params: Value) -> Result<Value> {
        Err(RpcError::Remote {
            code: ErrorCode::Unimplemented,
            detail: format!("method '{}' is not implemented", method),
        })
    }
}

async fn connect<H: Handler>(service: H) -> Result<GreeterClient> {
    let server = Server::new(service).tcp("127.0.0.1:0").await?;
    let addr = server.local_addr()?;
    tokio::spawn(async move {
        server.run().await.unwrap();
    });
    GreeterClient::connect(&ClientConfig::with_target(addr.to_string())).await
}

#[tokio::test]
async fn test_success_body_has_trailing_newline() -> Result<()> {
    let gateway = GreetGateway::new(connect(Greeter::new()).await?);

    assert_eq!(gateway.greet("World").await, "Hello World\n");
    assert_eq!(gateway.greet("").await, "Hello \n");

    Ok(())
}

#[tokio::test]
async fn test_failure_body_reports_detail_and_code() -> Result<()> {
    let gateway = GreetGateway::new(connect(EmptyService).await?);

    let body = gateway.greet("World").await;
    assert_eq!(
        body,
        "rpc SayHello, error: method 'SayHello' is not implemented, Error code: 12"
    );

    Ok(())
}

#[tokio::test]
async fn test_jittered_gateway_still_answers() -> Result<()> {
    let client = connect(Greeter::new()).await?;
    let gateway = Arc::new(GreetGateway::with_jitter(
        client,
        Jitter::uniform(Duration::from_millis(20)),
    ));

    let mut pending = vec![];
    for name in ["A", "B"] {
        let gateway = Arc::clone(&gateway);
        pending.push(tokio::spawn(async move { gateway.greet(name).await }));
    }

    let a = pending.remove(0).await.unwrap();
    let b = pending.remove(0).await.unwrap();
    assert_eq!(a, "Hello A\n");
    assert_eq!(b, "Hello B\n");

    Ok(())
}
