use serde::{Deserialize, Serialize};

use crate::channel::ChannelResult;

/// Endpoint used when no other is configured.
pub const DEFAULT_ENDPOINT: &str = "wss://javascript.info/article/websocket/demo/hello";

/// Retries after the first failure before the status stream gives up.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// How long a closing socket waits for the peer's close frame.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 5_000;

/// Configuration for a [`WebSocketChannel`](crate::channel::WebSocketChannel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// `ws://` or `wss://` address of the remote endpoint.
    pub url: String,
    /// Sub-protocols offered in `Sec-WebSocket-Protocol`.
    pub protocols: Vec<String>,
    /// Value of the `Origin` header, if any.
    pub origin: Option<String>,
    /// Retry budget of the derived status stream.
    pub retry_attempts: u32,
    /// Close handshake deadline in milliseconds. Past it the socket is
    /// dropped and the close is reported as unclean.
    pub close_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            protocols: Vec::new(),
            origin: None,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_close_timeout_ms(mut self, close_timeout_ms: u64) -> Self {
        self.close_timeout_ms = close_timeout_ms;
        self
    }

    /// Parse a JSON document. Missing fields fall back to the defaults.
    pub fn from_json(json: &str) -> ChannelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
