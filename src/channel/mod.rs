//! WebSocket Channel
//!
//! Wraps a tokio-tungstenite connection as a push-based stream with
//! lifecycle hooks (open, closing, close) and imperative `send`/`close`.
//!
//! The socket itself runs on a background tokio runtime. Its events are
//! queued and only dispatched to hooks and subscribers when the owning
//! thread calls [`WebSocketChannel::pump`], so all user callbacks run on
//! a single thread.

mod config;
mod error;
mod socket;
mod transport;

pub use config::{
    ChannelConfig, DEFAULT_CLOSE_TIMEOUT_MS, DEFAULT_ENDPOINT, DEFAULT_RETRY_ATTEMPTS,
};
pub use error::{ChannelError, ChannelResult};
pub use socket::{ChannelStream, CloseEvent, LifecycleHooks, Payload, ReadyState, WebSocketChannel};

#[cfg(test)]
pub(crate) use transport::TOKIO;
