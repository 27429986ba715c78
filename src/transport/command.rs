// MIT License - Copyright (c) 2026 Peter Wright
// Request/response engine for the Satel integration protocol

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::time::{Duration, timeout};
use tokio_util::codec::FramedWrite;
use tracing::{debug, error, warn};

use crate::codec::SatelCodec;
use crate::error::{Result, SatelError};
use crate::protocol::{Message, ReadCommand, Request};

/// Request waiting for its reply frame.
struct Pending {
    /// Command byte of the expected reply
    expected: u8,
    reply: oneshot::Sender<Message>,
}

/// Sends requests and routes reply frames back to the caller.
///
/// The protocol has no request ids, so only one request may be in flight:
/// callers queue on `request_lock` in arrival order.
pub struct CommandEngine {
    writer: Mutex<FramedWrite<OwnedWriteHalf, SatelCodec>>,
    pending: Mutex<Option<Pending>>,
    request_lock: Mutex<()>,
    connected: watch::Sender<bool>,
    response_timeout: Duration,
}

impl CommandEngine {
    pub fn new(writer: FramedWrite<OwnedWriteHalf, SatelCodec>, response_timeout: Duration) -> Self {
        Self {
            writer: Mutex::new(writer),
            pending: Mutex::new(None),
            request_lock: Mutex::new(()),
            connected: watch::Sender::new(true),
            response_timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Send a request and wait for its reply.
    pub async fn request(&self, request: &Request) -> Result<Message> {
        let _guard = self.request_lock.lock().await;

        if !self.is_connected() {
            return Err(SatelError::Disconnected);
        }

        let (tx, rx) = oneshot::channel();
        *self.pending.lock().await = Some(Pending {
            expected: request.reply_code(),
            reply: tx,
        });

        debug!("Sending {}", request.command);
        let sent = self.writer.lock().await.send(request.to_frame()).await;
        if let Err(e) = sent {
            error!("Failed to write {}: {}", request.command, e);
            self.mark_disconnected().await;
            return Err(e);
        }

        match timeout(self.response_timeout, rx).await {
            Ok(Ok(reply)) => {
                debug!("Reply to {}: {} bytes", request.command, reply.data.len());
                Ok(reply)
            }
            // Pending request dropped by the reader on disconnect
            Ok(Err(_)) => Err(SatelError::Disconnected),
            Err(_) => {
                self.pending.lock().await.take();
                warn!("No reply to {} within {:?}", request.command, self.response_timeout);
                Err(SatelError::CommandTimeout {
                    command: request.command.name().to_string(),
                })
            }
        }
    }

    /// Hand a received frame to the pending request if it is the expected reply.
    ///
    /// A result frame completes any pending request: the module answers a
    /// query it cannot serve with an error result instead of the data.
    /// Returns true when the frame completed a request.
    pub async fn complete(&self, message: &Message) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.take() {
            Some(p)
                if p.expected == message.command.code()
                    || message.command == ReadCommand::Result =>
            {
                let _ = p.reply.send(message.clone());
                true
            }
            other => {
                if other.is_none() && message.command == ReadCommand::Result {
                    warn!("Received result {:02X?} with no request pending", message.data);
                }
                *pending = other;
                false
            }
        }
    }

    /// Fail the pending request and refuse further ones.
    pub async fn mark_disconnected(&self) {
        self.connected.send_replace(false);
        self.pending.lock().await.take();
    }

    /// Resolves once the connection is gone.
    pub async fn closed(&self) {
        let mut rx = self.connected.subscribe();
        let _ = rx.wait_for(|connected| !*connected).await;
    }

    /// Close the write half of the socket.
    pub async fn shutdown(&self) {
        self.mark_disconnected().await;
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.get_mut().shutdown().await {
            debug!("Socket shutdown: {}", e);
        }
    }
}
