//! In-process gateway demo: an ephemeral server, one shared client, and a
//! handful of concurrent greet requests completing in whatever order their
//! simulated delays dictate.

use std::{error::Error, result, sync::Arc, time::Duration};

use greetrpc::{ClientConfig, GreetGateway, Greeter, GreeterClient, Jitter, Server};

#[tokio::main]
async fn main() -> result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let jitter = Jitter::uniform(Duration::from_millis(1000));
    let server = Server::new(Greeter::with_jitter(jitter))
        .tcp("127.0.0.1:0")
        .await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.run());

    let client = GreeterClient::connect(&ClientConfig::with_target(addr.to_string())).await?;
    let gateway = Arc::new(GreetGateway::with_jitter(client, jitter));

    let mut pending = Vec::new();
    for name in ["World", "you", "wörld"] {
        let gateway = Arc::clone(&gateway);
        pending.push(tokio::spawn(async move { gateway.greet(name).await }));
    }
    for task in pending {
        print!("{}", task.await?);
    }
    Ok(())
}
