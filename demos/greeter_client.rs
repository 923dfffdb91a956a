//! Greeter client: one call, one greeting printed.

use std::{error::Error, result};

use clap::Parser;
use greetrpc::{ClientConfig, GreeterClient, HelloRequest};

#[derive(Parser)]
struct Args {
    /// Server address to connect to, defaulting to the local well-known port.
    #[arg(long)]
    target: Option<String>,

    /// Name to greet.
    #[arg(default_value = "you")]
    name: String,
}

#[tokio::main]
async fn main() -> result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();
    let config = match args.target {
        Some(target) => ClientConfig::with_target(target),
        None => ClientConfig::default(),
    };
    let client = GreeterClient::connect(&config).await?;
    let reply = client.say_hello(HelloRequest { name: args.name }).await?;
    println!("{}", reply.message);
    Ok(())
}
