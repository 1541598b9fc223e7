//! A live WebSocket connection handed to an application handler.
//!
//! # States
//! ```text
//! (upgrade handshake, owned by axum) → Open → Closing → Closed
//!                                          ↘ Aborted
//! ```
//!
//! # Design Decisions
//! - The socket is split: the session keeps the read half, a writer task
//!   owns the write half and drains a bounded outbound queue
//! - Peers hold cloned `PeerSender`s, so broadcasts never touch the read half
//! - Dropping the session hands the read half to the writer task, which
//!   finishes the closing handshake; handlers never need an explicit close

use std::time::Duration;
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::net::connection::ConnectionId;

/// Frames that may wait in a session's outbound queue.
pub const OUTBOUND_QUEUE: usize = 256;

/// How long the closing handshake may take before the socket is dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

const NORMAL_CLOSURE: u16 = 1000;
const INTERNAL_ERROR: u16 = 1011;

/// Close code and reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

/// Application-level WebSocket message. Ping and pong are answered
/// transparently and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Bytes),
    Close(Option<CloseReason>),
}

impl WsMessage {
    pub fn text(text: impl Into<String>) -> Self {
        WsMessage::Text(text.into())
    }

    pub(crate) fn to_frame(&self) -> Message {
        match self {
            WsMessage::Text(text) => Message::Text(text.clone().into()),
            WsMessage::Binary(bytes) => Message::Binary(bytes.clone()),
            WsMessage::Close(reason) => Message::Close(reason.as_ref().map(|r| CloseFrame {
                code: r.code,
                reason: r.reason.clone().into(),
            })),
        }
    }

    fn from_frame(frame: Message) -> Option<Self> {
        match frame {
            Message::Text(text) => Some(WsMessage::Text(text.as_str().to_owned())),
            Message::Binary(bytes) => Some(WsMessage::Binary(bytes)),
            Message::Close(frame) => Some(WsMessage::Close(frame.map(|f| CloseReason {
                code: f.code,
                reason: f.reason.as_str().to_owned(),
            }))),
            Message::Ping(_) | Message::Pong(_) => None,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Frames flow both ways.
    Open,
    /// A close frame was sent or received; waiting for the stream to end.
    Closing,
    /// Closing handshake completed.
    Closed,
    /// The connection failed or ended without a closing handshake.
    Aborted,
}

/// The session's outbound queue has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("WebSocket session {0} is no longer accepting frames")]
pub struct SessionClosed(pub ConnectionId);

/// Cloneable handle for queueing frames to one session.
#[derive(Debug, Clone)]
pub struct PeerSender {
    id: ConnectionId,
    frames: mpsc::Sender<Message>,
}

impl PeerSender {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (frames, rx) = mpsc::channel(capacity);
        (Self { id: ConnectionId::new(), frames }, rx)
    }

    /// Queue a frame without waiting. Fails when the queue is full or the
    /// session has gone away.
    pub(crate) fn try_deliver(&self, frame: Message) -> bool {
        self.frames.try_send(frame).is_ok()
    }
}

struct Finish {
    inbound: SplitStream<WebSocket>,
    close_code: Option<u16>,
}

/// A live WebSocket connection.
pub struct WsSession {
    id: ConnectionId,
    host: String,
    path: String,
    state: SessionState,
    inbound: Option<SplitStream<WebSocket>>,
    outbound: PeerSender,
    finish: Option<oneshot::Sender<Finish>>,
}

impl WsSession {
    /// Take ownership of an upgraded socket and start its writer task.
    pub(crate) fn open(socket: WebSocket, host: String, path: String) -> Self {
        let id = ConnectionId::new();
        let (sink, stream) = socket.split();
        let (frames_tx, frames_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (finish_tx, finish_rx) = oneshot::channel();
        tokio::spawn(write_loop(id, sink, frames_rx, finish_rx));

        Self {
            id,
            host,
            path,
            state: SessionState::Open,
            inbound: Some(stream),
            outbound: PeerSender { id, frames: frames_tx },
            finish: Some(finish_tx),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Normalized host the session was routed on.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle for other tasks to queue frames to this session.
    pub fn sender(&self) -> PeerSender {
        self.outbound.clone()
    }

    /// Receive the next message. Returns `None` once the connection has
    /// ended; a close frame is returned once, as `WsMessage::Close`.
    pub async fn recv(&mut self) -> Option<WsMessage> {
        let inbound = self.inbound.as_mut()?;
        if matches!(self.state, SessionState::Closed | SessionState::Aborted) {
            return None;
        }
        loop {
            match inbound.next().await {
                Some(Ok(frame)) => {
                    let Some(message) = WsMessage::from_frame(frame) else {
                        continue;
                    };
                    if matches!(message, WsMessage::Close(_)) {
                        self.state = SessionState::Closing;
                    }
                    return Some(message);
                }
                Some(Err(e)) => {
                    tracing::debug!(session = %self.id, error = %e, "WebSocket receive failed");
                    self.state = SessionState::Aborted;
                    return None;
                }
                None => {
                    self.state = match self.state {
                        SessionState::Closing => SessionState::Closed,
                        _ => SessionState::Aborted,
                    };
                    return None;
                }
            }
        }
    }

    /// Queue a message, waiting for queue capacity.
    pub async fn send(&self, message: WsMessage) -> Result<(), SessionClosed> {
        if self.state != SessionState::Open {
            return Err(SessionClosed(self.id));
        }
        self.outbound
            .frames
            .send(message.to_frame())
            .await
            .map_err(|_| SessionClosed(self.id))
    }

    /// Start the closing handshake.
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<(), SessionClosed> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        self.state = SessionState::Closing;
        let frame = WsMessage::Close(Some(CloseReason {
            code,
            reason: reason.to_string(),
        }));
        self.outbound
            .frames
            .send(frame.to_frame())
            .await
            .map_err(|_| SessionClosed(self.id))
    }
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        let (Some(finish), Some(inbound)) = (self.finish.take(), self.inbound.take()) else {
            return;
        };
        let close_code = match self.state {
            SessionState::Open if std::thread::panicking() => Some(INTERNAL_ERROR),
            SessionState::Open => Some(NORMAL_CLOSURE),
            _ => None,
        };
        // The writer may already be gone if the socket failed.
        let _ = finish.send(Finish { inbound, close_code });
    }
}

async fn write_loop(
    id: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Message>,
    mut finish: oneshot::Receiver<Finish>,
) {
    let finish = loop {
        tokio::select! {
            biased;
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        tracing::debug!(session = %id, error = %e, "WebSocket send failed");
                        return;
                    }
                }
                None => break (&mut finish).await.ok(),
            },
            finish = &mut finish => break finish.ok(),
        }
    };

    if let Some(Finish { mut inbound, close_code }) = finish {
        if let Some(code) = close_code {
            let frame = Message::Close(Some(CloseFrame {
                code,
                reason: "".into(),
            }));
            if sink.send(frame).await.is_err() {
                return;
            }
        }
        // Reading flushes the peer's close reply and waits for its own.
        let drain = async { while let Some(Ok(_)) = inbound.next().await {} };
        let _ = tokio::time::timeout(CLOSE_GRACE, drain).await;
    }
    let _ = sink.close().await;
    tracing::trace!(session = %id, "WebSocket writer finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_conversion_keeps_payloads() {
        let text = WsMessage::text("hi");
        assert_eq!(WsMessage::from_frame(text.to_frame()), Some(text));

        let binary = WsMessage::Binary(Bytes::from_static(b"\x00\x01"));
        assert_eq!(WsMessage::from_frame(binary.to_frame()), Some(binary));

        let close = WsMessage::Close(Some(CloseReason {
            code: 1001,
            reason: "going away".into(),
        }));
        assert_eq!(WsMessage::from_frame(close.to_frame()), Some(close));
    }

    #[test]
    fn control_frames_are_hidden() {
        assert_eq!(WsMessage::from_frame(Message::Ping(Bytes::new())), None);
        assert_eq!(WsMessage::from_frame(Message::Pong(Bytes::new())), None);
    }

    #[tokio::test]
    async fn peer_sender_fails_once_queue_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        let peer = PeerSender { id: ConnectionId::new(), frames: tx };
        assert!(peer.try_deliver(Message::Text("a".into())));
        // Full queue.
        assert!(!peer.try_deliver(Message::Text("b".into())));
        drop(rx);
        assert!(!peer.try_deliver(Message::Text("c".into())));
    }
}
