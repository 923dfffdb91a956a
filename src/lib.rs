//! Greeter RPC demo in Rust.
//!
//! Two processes exchange a single greeting over one unary RPC method:
//! a server hosts the `Greeter` service, whose `SayHello` method turns a name
//! into a greeting, and a client holds one connection to it and issues calls.
//! A gateway type renders call outcomes as plain-text HTTP response bodies.
//! Frames are MessagePack over TCP.
//!
//! To run a server:
//! 1. Build a `Greeter` (optionally with a simulated-latency `Jitter`)
//! 2. Create a `Server` with it and call `server.tcp(addr)`
//! 3. Call `server.run()`
//!
//! To call it:
//! 1. Build a `ClientConfig` (defaults to the well-known local port)
//! 2. Connect a `GreeterClient` and call `say_hello`
//!
//! Uses `tokio` for async I/O and `rmpv`/`rmp-serde` for serialization.

mod config;
mod connection;
mod error;
mod gateway;
mod greeter;
mod message;
mod transport;

pub use config::*;
pub use connection::*;
pub use error::*;
pub use gateway::*;
pub use greeter::*;
pub use message::*;
pub use transport::*;

pub use rmpv::Value;
