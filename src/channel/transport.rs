//! Socket task running on the background runtime.
//!
//! Each connection gets its own task. The task never touches observers or
//! hooks; it only reports [`TransportEvent`]s tagged with its connection id.

use futures_util::{SinkExt, StreamExt};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as async_mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::channel::{ChannelConfig, ChannelError, ChannelResult, CloseEvent, Payload};

/// Normal closure.
pub(crate) const CLOSE_NORMAL: u16 = 1000;
/// Close frame without a status code.
pub(crate) const CLOSE_NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame.
pub(crate) const CLOSE_ABNORMAL: u16 = 1006;

/// Static Tokio runtime shared by all socket tasks.
pub(crate) static TOKIO: once_cell::sync::Lazy<tokio::runtime::Runtime> =
    once_cell::sync::Lazy::new(|| {
        // wss:// needs a process-wide rustls provider; ignore "already installed".
        let _ = rustls::crypto::ring::default_provider().install_default();

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .thread_name("socket-status")
            .build()
            .expect("Failed to build WebSocket runtime")
    });

#[derive(Debug)]
pub(crate) enum TransportEvent {
    Open,
    Message(Payload),
    Error(ChannelError),
    Closed(CloseEvent),
}

#[derive(Debug)]
enum Outbound {
    Message(Payload),
    Close { code: u16, reason: String },
}

pub(crate) type EventSender = mpsc::Sender<(u64, TransportEvent)>;

/// Handle to one socket task. Dropping it closes the socket.
pub(crate) struct Connection {
    id: u64,
    sender: async_mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    /// Spawn a socket task for `config`. Returns immediately.
    pub(crate) fn open(id: u64, config: &ChannelConfig, events: EventSender) -> Self {
        let (sender, receiver) = async_mpsc::unbounded_channel();
        let config = config.clone();

        TOKIO.spawn(run_connection(id, config, receiver, events));

        Self { id, sender }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn send(&self, payload: Payload) -> ChannelResult<()> {
        self.sender
            .send(Outbound::Message(payload))
            .map_err(|e| ChannelError::Transport(format!("Failed to send: {}", e)))
    }

    pub(crate) fn close(&self, code: u16, reason: impl Into<String>) {
        let reason = reason.into();
        if self.sender.send(Outbound::Close { code, reason }).is_err() {
            log::debug!("[WebSocket {}] Close requested after the task ended", self.id);
        }
    }
}

fn emit(events: &EventSender, id: u64, event: TransportEvent) {
    if events.send((id, event)).is_err() {
        log::debug!("[WebSocket {}] Channel dropped, discarding event", id);
    }
}

/// Report a failed connection the way a browser socket does: an error
/// followed by an abnormal close.
fn fail(events: &EventSender, id: u64, error: ChannelError, reason: &str) {
    emit(events, id, TransportEvent::Error(error));
    emit(
        events,
        id,
        TransportEvent::Closed(CloseEvent {
            code: CLOSE_ABNORMAL,
            reason: reason.to_string(),
            was_clean: false,
        }),
    );
}

/// Whether a read error after the handshake means the peer went away
/// without a close frame, as opposed to a broken frame or a TLS failure.
fn is_connection_drop(error: &tungstenite::Error) -> bool {
    match error {
        tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        tungstenite::Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

fn build_request(config: &ChannelConfig) -> ChannelResult<Request> {
    let url = url::Url::parse(&config.url)
        .map_err(|e| ChannelError::invalid_url(&config.url, e))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(ChannelError::invalid_url(
                &config.url,
                format!("unsupported scheme '{}'", other),
            ));
        }
    }

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ChannelError::invalid_url(&config.url, e))?;

    if let Some(ref origin) = config.origin {
        let value = origin
            .parse::<HeaderValue>()
            .map_err(|e| ChannelError::Config(format!("Invalid origin: {}", e)))?;
        request.headers_mut().insert("Origin", value);
    }

    if !config.protocols.is_empty() {
        let value = config
            .protocols
            .join(", ")
            .parse::<HeaderValue>()
            .map_err(|e| ChannelError::Config(format!("Invalid protocol list: {}", e)))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }

    Ok(request)
}

async fn run_connection(
    id: u64,
    config: ChannelConfig,
    mut outbound: async_mpsc::UnboundedReceiver<Outbound>,
    events: EventSender,
) {
    log::info!("[WebSocket {}] Connecting to {}", id, config.url);

    let request = match build_request(&config) {
        Ok(request) => request,
        Err(e) => {
            log::error!("[WebSocket {}] {}", id, e);
            fail(&events, id, e, "Invalid request");
            return;
        }
    };

    let ws_stream = match tokio_tungstenite::connect_async(request).await {
        Ok((stream, response)) => {
            log::info!(
                "[WebSocket {}] Connected successfully (status: {})",
                id,
                response.status()
            );
            stream
        }
        Err(e) => {
            log::error!("[WebSocket {}] Connection failed: {}", id, e);
            fail(
                &events,
                id,
                ChannelError::connect_failed(&config.url, e),
                "Connection failed",
            );
            return;
        }
    };

    emit(&events, id, TransportEvent::Open);

    let (mut write, mut read) = ws_stream.split();
    let mut peer_close: Option<(u16, String)> = None;
    let mut closing = false;
    let close_timeout = Duration::from_millis(config.close_timeout_ms);
    let close_deadline = tokio::time::sleep(Duration::from_secs(24 * 60 * 60));
    tokio::pin!(close_deadline);

    loop {
        tokio::select! {
            command = outbound.recv(), if !closing => {
                let (code, reason) = match command {
                    Some(Outbound::Message(payload)) => {
                        if let Err(e) = write.send(payload.into_message()).await {
                            log::error!("[WebSocket {}] Send error: {}", id, e);
                        }
                        continue;
                    }
                    Some(Outbound::Close { code, reason }) => (code, reason),
                    // Every handle is gone; nobody is listening anymore.
                    None => (CLOSE_NORMAL, String::new()),
                };

                log::info!("[WebSocket {}] Closing (code {})", id, code);
                closing = true;
                close_deadline
                    .as_mut()
                    .reset(tokio::time::Instant::now() + close_timeout);

                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: reason.into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    log::warn!("[WebSocket {}] Failed to send close frame: {}", id, e);
                }
            }
            _ = &mut close_deadline, if closing => {
                log::warn!("[WebSocket {}] Close handshake timed out", id);
                break;
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        log::debug!(
                            "[WebSocket {}] Received: {}",
                            id,
                            text.chars().take(100).collect::<String>()
                        );
                        emit(&events, id, TransportEvent::Message(Payload::Text(text.to_string())));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        log::debug!("[WebSocket {}] Received binary ({} bytes)", id, data.len());
                        emit(&events, id, TransportEvent::Message(Payload::Binary(data.to_vec())));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((CLOSE_NO_STATUS, String::new()));
                        log::info!("[WebSocket {}] Received close: {} {}", id, code, reason);
                        peer_close = Some((code, reason));
                    }
                    // Ping/pong are answered by tungstenite.
                    Some(Ok(_)) => {}
                    Some(Err(tungstenite::Error::ConnectionClosed))
                    | Some(Err(tungstenite::Error::AlreadyClosed)) => break,
                    Some(Err(e)) => {
                        if peer_close.is_some() {
                            log::debug!("[WebSocket {}] Error after close frame: {}", id, e);
                            break;
                        }
                        if is_connection_drop(&e) {
                            log::warn!("[WebSocket {}] Connection dropped: {}", id, e);
                            break;
                        }
                        log::error!("[WebSocket {}] Read error: {}", id, e);
                        fail(
                            &events,
                            id,
                            ChannelError::Transport(e.to_string()),
                            "Connection error",
                        );
                        return;
                    }
                    None => break,
                }
            }
        }
    }

    let event = match peer_close {
        Some((code, reason)) => CloseEvent {
            code,
            reason,
            was_clean: true,
        },
        None => CloseEvent {
            code: CLOSE_ABNORMAL,
            reason: String::new(),
            was_clean: false,
        },
    };
    emit(&events, id, TransportEvent::Closed(event));
    log::info!("[WebSocket {}] Connection ended", id);
}
