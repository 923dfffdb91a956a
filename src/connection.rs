//! Per-connection plumbing for clients and servers.
//!
//! A connection owns the framed stream: a blocking decode loop feeds frames
//! into a channel, writes go through the write half, and a pending-request
//! table matches each response to the call that issued it. Replies may arrive
//! in any order; the table keys them by request id, so concurrent calls never
//! receive each other's results.
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rmpv::Value;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{split, AsyncRead, AsyncWrite, AsyncWriteExt, WriteHalf},
    runtime::Handle,
    sync::{mpsc, oneshot, Mutex},
};
use tokio_util::io::SyncIoBridge;
use tracing::{error, trace, warn};

use crate::{
    error::{Result, RpcError},
    message::*,
};

/// A single outbound call queued from the client API to the connection task.
#[derive(Debug)]
pub(crate) struct Call {
    /// Method name.
    pub(crate) method: String,
    /// Encoded request message.
    pub(crate) params: Value,
    /// Channel for delivering the reply or the error. Exactly one of the two
    /// is sent per call.
    pub(crate) reply: oneshot::Sender<Result<Value>>,
}

/// The interface for issuing calls over a client connection.
#[derive(Debug, Clone)]
pub struct RpcSender {
    /// Channel sender feeding the connection task.
    pub(crate) sender: mpsc::Sender<Call>,
}

impl RpcSender {
    /// Sends a raw request and waits for the response value.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let (reply, reply_receiver) = oneshot::channel();
        self.sender
            .send(Call {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| RpcError::Disconnect)?;
        reply_receiver.await.map_err(|_| RpcError::Disconnect)?
    }

    /// Sends a typed request and deserializes the response.
    pub async fn call<Req, Resp>(&self, method: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let value = self.send_request(method, to_wire(req)?).await?;
        from_wire(&value)
    }
}

/// A server-side service implementation.
///
/// `handle` is invoked once per inbound request, each in its own task, so
/// implementations must not rely on cross-request ordering. Use the
/// `#[async_trait]` attribute when implementing this trait.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one request and produces the encoded reply or an error.
    async fn handle(&self, method: &str, params: Value) -> Result<Value>;
}

/// Low-level connection handler for reading and writing frames over a stream.
#[derive(Debug)]
pub struct RpcConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Receiver for decoded inbound frames.
    frame_receiver: Option<mpsc::Receiver<Result<Frame>>>,
    /// Write half of the stream.
    write_half: WriteHalf<S>,
    /// Next request ID to use.
    next_request_id: u32,
    /// Pending requests awaiting responses.
    pending: HashMap<u32, oneshot::Sender<Result<Value>>>,
}

impl<S> RpcConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Creates a new RpcConnection over the given stream.
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = split(stream);
        let (frame_sender, frame_receiver) = mpsc::channel(1000);

        // Spawn a blocking task to decode inbound frames
        Handle::current().spawn_blocking(move || {
            let mut sync_reader = SyncIoBridge::new(read_half);
            loop {
                match Frame::decode(&mut sync_reader) {
                    Ok(frame) => {
                        if frame_sender.blocking_send(Ok(frame)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // Receiver dropped means the handler exited; ignore send errors.
                        drop(frame_sender.blocking_send(Err(e)));
                        break;
                    }
                }
            }
        });

        Self {
            frame_receiver: Some(frame_receiver),
            write_half,
            next_request_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Takes ownership of the inbound frame channel.
    pub fn receiver(&mut self) -> mpsc::Receiver<Result<Frame>> {
        self.frame_receiver.take().expect("Receiver already taken")
    }

    /// Routes an inbound response to the pending call that issued it.
    pub fn handle_response(&mut self, response: Response) -> Result<()> {
        if let Some(reply) = self.pending.remove(&response.id) {
            // Receiver may be dropped if the caller gave up waiting; ignore send errors.
            drop(reply.send(response.result.map_err(RpcError::from)));
            Ok(())
        } else {
            Err(RpcError::Protocol(format!(
                "Response for unknown request id {}",
                response.id
            )))
        }
    }

    /// Fails every pending call with a disconnect error.
    pub fn fail_pending(&mut self) {
        for (_, reply) in self.pending.drain() {
            drop(reply.send(Err(RpcError::Disconnect)));
        }
    }

    /// Encodes and writes a frame to the stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        trace!("sending frame: {:?}", frame);
        let mut buffer = Vec::new();
        frame.encode(&mut buffer)?;
        self.write_half.write_all(&buffer).await?;
        self.write_half.flush().await?;
        Ok(())
    }

    /// Sends a request frame and registers its reply channel.
    pub async fn send_request(
        &mut self,
        method: String,
        params: Value,
        reply: oneshot::Sender<Result<Value>>,
    ) -> Result<()> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending.insert(id, reply);
        let request = Request { id, method, params };
        self.write_frame(&Frame::Request(request)).await
    }
}

/// Drives a client connection: forwards queued calls to the peer and routes
/// responses back to their callers until the connection closes.
pub(crate) async fn drive_client<S>(
    mut conn: RpcConnection<S>,
    mut calls: mpsc::Receiver<Call>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let mut frames = conn.receiver();
    let result = loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(Ok(Frame::Response(response))) => {
                    if let Err(e) = conn.handle_response(response) {
                        warn!("error handling response: {}", e);
                    }
                }
                Some(Ok(Frame::Request(request))) => {
                    // The greeter protocol is unary; a client never serves.
                    warn!("unexpected request frame id={}", request.id);
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            },
            call = calls.recv() => match call {
                Some(Call { method, params, reply }) => {
                    if let Err(e) = conn.send_request(method, params, reply).await {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },
        }
    };
    conn.fail_pending();
    result
}

/// Serves one inbound connection: each decoded request is handled in its own
/// spawned task, so in-flight calls proceed independently.
pub(crate) async fn serve_connection<S, H>(mut conn: RpcConnection<S>, service: Arc<H>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    H: Handler,
{
    let mut frames = conn.receiver();
    let conn = Arc::new(Mutex::new(conn));
    let mut in_flight = Vec::new();

    let result = loop {
        match frames.recv().await {
            Some(Ok(Frame::Request(request))) => {
                let conn = Arc::clone(&conn);
                let service = Arc::clone(&service);
                in_flight.push(tokio::spawn(async move {
                    if let Err(e) = answer_request(conn, service, request).await {
                        error!("error answering request: {}", e);
                    }
                }));
            }
            Some(Ok(Frame::Response(response))) => {
                warn!("unexpected response frame id={}", response.id);
            }
            Some(Err(e)) => break Err(e),
            None => break Ok(()),
        }
    };

    // Let in-flight handlers finish before tearing the connection down.
    for handler in in_flight {
        if let Err(e) = handler.await {
            error!("error joining request handler: {}", e);
        }
    }

    result
}

/// Invokes the service for one request and writes the response frame.
async fn answer_request<S, H>(
    conn: Arc<Mutex<RpcConnection<S>>>,
    service: Arc<H>,
    request: Request,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    H: Handler,
{
    let result = service.handle(&request.method, request.params).await;
    let response = Response {
        id: request.id,
        result: result.map_err(|e| {
            warn!("service error: {}", e);
            Fault {
                code: e.code(),
                detail: e.to_string(),
            }
        }),
    };
    let mut conn = conn.lock().await;
    conn.write_frame(&Frame::Response(response)).await
}
