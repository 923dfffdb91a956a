//! Networking components for the RPC server and client.
//!
//! TCP only, and insecure by construction: the demo protocol runs without
//! TLS on both sides.

use std::{net::SocketAddr, sync::Arc};

use rmpv::Value;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    net::{TcpListener as TokioTcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::trace;

use crate::{
    connection::{drive_client, serve_connection, Call, Handler, RpcConnection, RpcSender},
    error::*,
};

/// TCP listener for accepting RPC connections.
struct TcpListener {
    /// The underlying tokio TCP listener.
    inner: TokioTcpListener,
}

impl TcpListener {
    /// Binds a TCP listener to the given address.
    async fn bind(addr: &str) -> Result<Self> {
        trace!("Binding TCP listener to address: {}", addr);
        let listener = TokioTcpListener::bind(addr).await?;
        Ok(Self { inner: listener })
    }

    /// Accepts an incoming TCP connection.
    async fn accept(&self) -> Result<RpcConnection<TcpStream>> {
        let (stream, addr) = self.inner.accept().await?;
        trace!("Accepted TCP connection from: {}", addr);
        Ok(RpcConnection::new(stream))
    }
}

/// RPC server hosting a single service over TCP. One service instance is
/// shared by every connection; handlers hold no per-call mutable state.
pub struct Server<H>
where
    H: Handler,
{
    /// The service implementation.
    service: Arc<H>,
    /// The bound listener, once configured.
    listener: Option<TcpListener>,
}

impl<H> Server<H>
where
    H: Handler,
{
    /// Creates a new Server hosting the given service.
    pub fn new(service: H) -> Self {
        Self {
            service: Arc::new(service),
            listener: None,
        }
    }

    /// Configures the server to listen on a TCP address.
    pub async fn tcp(mut self, addr: &str) -> Result<Self> {
        self.listener = Some(TcpListener::bind(addr).await?);
        Ok(self)
    }

    /// Returns the bound address of the server. Only valid once a listener
    /// has been configured, otherwise returns an error.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &self.listener {
            Some(listener) => Ok(listener.inner.local_addr()?),
            None => Err(RpcError::Protocol("No listener configured".into())),
        }
    }

    /// Starts the server and accepts connections until the process exits.
    pub async fn run(self) -> Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| RpcError::Protocol("No listener configured".into()))?;
        loop {
            let conn = listener.accept().await?;
            let service = Arc::clone(&self.service);
            tokio::spawn(async move {
                match serve_connection(conn, service).await {
                    Ok(()) => {
                        trace!("Connection closed");
                    }
                    Err(RpcError::Io(_)) | Err(RpcError::Disconnect) => {
                        trace!("Client disconnected");
                    }
                    Err(e) => {
                        tracing::warn!("Connection error: {}", e);
                    }
                }
            });
        }
    }
}

/// RPC client wrapping one outbound TCP connection, created once and reused
/// for every subsequent call in the process.
#[derive(Debug)]
pub struct Client {
    /// The interface for issuing calls.
    pub sender: RpcSender,
    /// Handle to the background connection task.
    handle: JoinHandle<()>,
}

impl Client {
    /// Connects to a TCP address.
    pub async fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| RpcError::Connect { source })?;
        trace!("TCP connection established to: {}", addr);
        Self::new(RpcConnection::new(stream))
    }

    /// Creates a new client from an existing RPC connection.
    fn new(connection: RpcConnection<TcpStream>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Call>(100);
        let handle = tokio::spawn(async move {
            if let Err(e) = drive_client(connection, receiver).await {
                match e {
                    RpcError::Io(_) | RpcError::Disconnect => {
                        trace!("Client disconnected");
                    }
                    e => {
                        tracing::warn!("Connection error: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            sender: RpcSender { sender },
            handle,
        })
    }

    /// Sends a raw request to the server. Convenience method for
    /// `RpcSender::send_request`.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        self.sender.send_request(method, params).await
    }

    /// Sends a typed request and deserializes the response. Convenience
    /// method for `RpcSender::call`.
    pub async fn call<Req, Resp>(&self, method: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.sender.call(method, req).await
    }

    /// Waits for the connection task to complete.
    pub async fn join(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| RpcError::Protocol(e.to_string()))?;
        Ok(())
    }
}
