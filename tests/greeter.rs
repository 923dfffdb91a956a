//! Integration tests for the greeter service and client stub.

use std::{sync::Arc, time::Duration, time::Instant};

use greetrpc::{
    to_wire, Client, ClientConfig, ErrorCode, Greeter, GreeterClient, HelloReply, HelloRequest,
    Jitter, Result, RpcError, Server,
};
use tokio::task;
use tracing_test::traced_test;

/// Starts a greeter server on an ephemeral port and connects a stub to it.
async fn setup(service: Greeter) -> Result<GreeterClient> {
    let server = Server::new(service).tcp("127.0.0.1:0").await?;
    let addr = server.local_addr()?;

    let _server_handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });

    GreeterClient::connect(&ClientConfig::with_target(addr.to_string())).await
}

#[tokio::test]
async fn test_say_hello_world() -> Result<()> {
    let client = setup(Greeter::new()).await?;

    let reply = client
        .say_hello(HelloRequest {
            name: "World".into(),
        })
        .await?;
    assert_eq!(reply.message, "Hello World");

    Ok(())
}

#[tokio::test]
async fn test_names_are_carried_verbatim() -> Result<()> {
    let client = setup(Greeter::new()).await?;

    for name in ["", "two words", " leading", "wörld 🌍", "O'Brien\n"] {
        let reply = client
            .say_hello(HelloRequest { name: name.into() })
            .await?;
        assert_eq!(reply.message, format!("Hello {}", name));
    }

    Ok(())
}

#[tokio::test]
async fn test_concurrent_calls_do_not_cross_contaminate() -> Result<()> {
    let client = Arc::new(setup(Greeter::with_jitter(Jitter::uniform(Duration::from_millis(20)))).await?);

    let mut handles = vec![];
    for i in 0..100u32 {
        let client = Arc::clone(&client);
        handles.push(task::spawn(async move {
            let name = format!("task-{}", i);
            let reply = client.say_hello(HelloRequest { name: name.clone() }).await?;
            assert_eq!(reply.message, format!("Hello {}", name));
            Ok::<_, RpcError>(())
        }));
    }

    for handle in handles {
        handle.await.unwrap()?;
    }

    Ok(())
}

#[tokio::test]
async fn test_jittered_replies_stay_bounded() -> Result<()> {
    let client = setup(Greeter::with_jitter(Jitter::uniform(Duration::from_millis(50)))).await?;

    for _ in 0..3 {
        let start = Instant::now();
        let reply = client
            .say_hello(HelloRequest { name: "you".into() })
            .await?;
        assert_eq!(reply.message, "Hello you");
        // Configured bound plus generous scheduling slack.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    Ok(())
}

#[tokio::test]
async fn test_unknown_method_is_unimplemented() -> Result<()> {
    let server = Server::new(Greeter::new()).tcp("127.0.0.1:0").await?;
    let addr = server.local_addr()?;
    tokio::spawn(async move {
        server.run().await.unwrap();
    });

    let client = Client::connect_tcp(&addr.to_string()).await?;
    let result = client
        .send_request(
            "Frobnicate",
            to_wire(&HelloRequest {
                name: "World".into(),
            })?,
        )
        .await;

    match result {
        Err(RpcError::Remote { code, detail }) => {
            assert_eq!(code, ErrorCode::Unimplemented);
            assert!(detail.contains("Frobnicate"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_unreachable_target_fails_with_code() {
    // Nothing listens on the discard port.
    let result = GreeterClient::connect(&ClientConfig::with_target("127.0.0.1:9")).await;

    match result {
        Err(e) => {
            assert_eq!(e.code(), ErrorCode::Unavailable);
            assert!(!e.to_string().is_empty());
        }
        Ok(_) => panic!("expected connect to fail"),
    }
}

#[tokio::test]
async fn test_raw_call_matches_stub() -> Result<()> {
    let server = Server::new(Greeter::new()).tcp("127.0.0.1:0").await?;
    let addr = server.local_addr()?;
    tokio::spawn(async move {
        server.run().await.unwrap();
    });

    let client = Client::connect_tcp(&addr.to_string()).await?;
    let reply: HelloReply = client
        .call(
            "SayHello",
            &HelloRequest {
                name: "World".into(),
            },
        )
        .await?;
    assert_eq!(reply.message, "Hello World");

    Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_handler_logs_received_requests() -> Result<()> {
    let client = setup(Greeter::new()).await?;

    client
        .say_hello(HelloRequest {
            name: "World".into(),
        })
        .await?;

    assert!(logs_contain("rpc SayHello"));
    Ok(())
}
