// MIT License - Copyright (c) 2026 Peter Wright
// TCP connection to the ETHM module

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use crate::codec::SatelCodec;
use crate::config::SatelConfig;
use crate::constants::{BUSY_CHECK_MS, BUSY_MARKER};
use crate::crypto::EncryptedSession;
use crate::error::{Result, SatelError};
use crate::event::EventSender;
use crate::protocol::{Message, Request};
use crate::state::SharedState;
use crate::transport::command::CommandEngine;

/// An open connection: the request engine plus the task reading frames.
pub struct SatelConnection {
    engine: Arc<CommandEngine>,
    reader_handle: Option<JoinHandle<()>>,
}

impl SatelConnection {
    /// Connect to the module and start reading frames.
    ///
    /// Every received frame is applied to `state`; the resulting change
    /// events go out on `event_tx`.
    pub async fn open(config: &SatelConfig, state: SharedState, event_tx: EventSender) -> Result<Self> {
        info!("Connecting to Satel Integra at {}", config.address());

        let stream = timeout(
            Duration::from_millis(config.connect_timeout_ms),
            TcpStream::connect(config.address()),
        )
        .await
        .map_err(|_| SatelError::ConnectionTimeout)??;
        stream.set_nodelay(true)?;

        check_busy(&stream).await?;
        debug!("TCP connection established");

        let codec = match &config.integration_key {
            Some(key) => {
                let session = EncryptedSession::new(key);
                debug!("Encrypted session id {}", session.session_id());
                SatelCodec::encrypted(Arc::new(Mutex::new(session)))
            }
            None => SatelCodec::plain(),
        };

        let (reader, writer) = stream.into_split();
        let engine = Arc::new(CommandEngine::new(
            FramedWrite::new(writer, codec.clone()),
            Duration::from_millis(config.response_timeout_ms),
        ));
        let reader_handle = spawn_reader_task(
            FramedRead::new(reader, codec),
            engine.clone(),
            state,
            event_tx,
        );

        Ok(Self {
            engine,
            reader_handle: Some(reader_handle),
        })
    }

    pub async fn request(&self, request: &Request) -> Result<Message> {
        self.engine.request(request).await
    }

    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    /// Resolves once the connection is lost or closed.
    pub async fn closed(&self) {
        self.engine.closed().await
    }

    pub async fn close(&self) {
        self.engine.shutdown().await;
        if let Some(handle) = &self.reader_handle {
            handle.abort();
        }
    }
}

impl Drop for SatelConnection {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
    }
}

/// Fail with `PanelBusy` when the module greets us with its busy notice.
///
/// The module answers a second client with `Busy!` and drops it; a silent
/// socket means the connection is ours.
async fn check_busy(stream: &TcpStream) -> Result<()> {
    let mut buf = [0u8; 64];
    match timeout(Duration::from_millis(BUSY_CHECK_MS), stream.peek(&mut buf)).await {
        Err(_) => Ok(()),
        Ok(Ok(0)) => Err(SatelError::Disconnected),
        Ok(Ok(n)) => {
            if buf[..n].windows(BUSY_MARKER.len()).any(|w| w == BUSY_MARKER) {
                warn!("Panel reports busy, another client is connected");
                return Err(SatelError::PanelBusy);
            }
            trace!("Data after connect: {:02X?}", &buf[..n]);
            Ok(())
        }
        Ok(Err(e)) => Err(SatelError::Io(e)),
    }
}

/// Spawn the task that decodes incoming frames.
fn spawn_reader_task(
    mut reader: FramedRead<OwnedReadHalf, SatelCodec>,
    engine: Arc<CommandEngine>,
    state: SharedState,
    event_tx: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = reader.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Connection error: {}", e);
                    break;
                }
            };

            let message = match Message::try_from(frame) {
                Ok(message) => message,
                Err(e) => {
                    debug!("Ignoring frame: {}", e);
                    continue;
                }
            };

            let events = state.write().await.apply(&message);
            engine.complete(&message).await;
            for event in events {
                let _ = event_tx.send(event);
            }
        }

        debug!("Reader: connection closed");
        engine.mark_disconnected().await;
    })
}
