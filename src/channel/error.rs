use thiserror::Error;

use crate::channel::ReadyState;

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors raised by the WebSocket channel.
///
/// `Clone` because one failure is multicast to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Invalid WebSocket URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("Connection died (code {code}): {reason}")]
    ClosedUncleanly { code: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    /// `send` outside the open state. The transport would drop the frame.
    #[error("WebSocket is not open (state: {0})")]
    NotOpen(ReadyState),

    #[error("Invalid channel configuration: {0}")]
    Config(String),
}

impl ChannelError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn connect_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConnectFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
