use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;

use crate::channel::{
    ChannelConfig, ChannelError, ChannelResult, CloseEvent, LifecycleHooks, Payload,
    WebSocketChannel,
};
use crate::observable::{Observable, ObservableExt};
use crate::view::ObserveBinding;

/// Type-erased status stream.
pub type DynStatus = dyn Observable<Item = Payload, Error = ChannelError>;

/// The channel stream after logging and retry.
pub type StatusStream = Rc<DynStatus>;

/// Payload sent by the "Send message" action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub kind: &'static str,
    pub sequence: u64,
}

pub struct SocketWidget {
    channel: WebSocketChannel,
    status: StatusStream,
    binding: ObserveBinding<DynStatus>,
    sent: Cell<u64>,
}

impl SocketWidget {
    pub fn new(config: ChannelConfig) -> Self {
        let retry_attempts = config.retry_attempts;
        let channel = WebSocketChannel::new(config, logging_hooks());

        let status: StatusStream = Rc::new(
            channel
                .stream()
                .tap(|payload: &Payload| log::info!("data: {:?}", payload))
                .retry(retry_attempts),
        );

        Self {
            channel,
            status,
            binding: ObserveBinding::new(),
            sent: Cell::new(0),
        }
    }

    pub fn channel(&self) -> &WebSocketChannel {
        &self.channel
    }

    pub fn status_stream(&self) -> StatusStream {
        self.status.clone()
    }

    pub fn binding(&self) -> &ObserveBinding<DynStatus> {
        &self.binding
    }

    /// Render pass. Subscribes on first use and returns the status value.
    pub fn render(&mut self) -> Option<String> {
        self.binding.bind(&self.status)
    }

    /// The text shown in the status region.
    pub fn status_line(&self) -> String {
        format!("Status: {}", self.binding.value().unwrap_or_default())
    }

    /// "Send message" action.
    pub fn send_message(&self) -> ChannelResult<()> {
        let message = OutgoingMessage {
            kind: "message",
            sequence: self.sent.get() + 1,
        };
        let json = serde_json::to_string(&message)
            .map_err(|e| ChannelError::Transport(format!("Failed to encode message: {}", e)))?;

        self.channel.send(json)?;
        self.sent.set(message.sequence);
        log::debug!("Sent message #{}", message.sequence);
        Ok(())
    }

    /// "Disconnect" action.
    pub fn disconnect(&self) {
        self.channel.close();
    }

    pub fn pump(&self) -> usize {
        self.channel.pump()
    }

    /// The view went away for good.
    pub fn unmount(&mut self) {
        self.binding.dispose();
    }
}

fn logging_hooks() -> LifecycleHooks {
    LifecycleHooks::new()
        .on_open(|| log::info!("The connection is open"))
        .on_closing(|| log::info!("The connection is going to be closed"))
        .on_close(log_close)
}

fn log_close(event: &CloseEvent) {
    if event.was_clean {
        log::info!(
            "The connection is closed, code={} reason={}",
            event.code,
            event.reason
        );
    } else {
        log::warn!("Connection died, code={}", event.code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ReadyState;
    use crate::view::{BindingState, COMPLETE, MESSAGE_RECEIVED};
    use std::time::{Duration, Instant};

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{}", addr)
    }

    fn pump_until(widget: &mut SocketWidget, mut done: impl FnMut(&mut SocketWidget) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            widget.pump();
            widget.render();
            if done(widget) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_outgoing_message_json() {
        let json = serde_json::to_string(&OutgoingMessage {
            kind: "message",
            sequence: 7,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"message","sequence":7}"#);
    }

    #[test]
    fn test_nothing_connects_before_render() {
        let widget = SocketWidget::new(ChannelConfig::new(unreachable_url()));

        assert_eq!(widget.channel().ready_state(), ReadyState::Idle);
        assert_eq!(widget.status_line(), "Status: ");
        assert!(matches!(
            widget.send_message(),
            Err(ChannelError::NotOpen(ReadyState::Idle))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_exhausts_retries() {
        let mut widget = SocketWidget::new(ChannelConfig::new(unreachable_url()));

        assert_eq!(widget.render(), None);
        assert!(pump_until(&mut widget, |w| {
            w.binding().state() == BindingState::Errored
        }));

        assert_eq!(widget.channel().connection_attempts(), 4);
        assert_eq!(widget.binding().value(), None);
        assert_eq!(widget.status_line(), "Status: ");
    }

    #[test]
    fn test_unmount_closes_connection() {
        let mut widget = SocketWidget::new(ChannelConfig::new(unreachable_url()).with_retry_attempts(0));

        widget.render();
        assert_eq!(widget.channel().subscriber_count(), 1);

        widget.unmount();
        widget.unmount();

        assert_eq!(widget.channel().subscriber_count(), 0);
        assert_eq!(widget.binding().state(), BindingState::Idle);
    }

    mod live {
        use super::*;
        use crate::channel::ChannelConfig;
        use futures_util::{SinkExt, StreamExt};
        use tokio::net::TcpListener;
        use tokio_tungstenite::tungstenite::Message;

        /// Greets with "ping" and records every text frame it receives.
        fn spawn_server(received: std::sync::Arc<std::sync::Mutex<Vec<String>>>) -> String {
            let runtime = &*crate::channel::TOKIO;
            let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
            let addr = listener.local_addr().unwrap();

            runtime.spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let received = received.clone();
                    tokio::spawn(async move {
                        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                            return;
                        };
                        if ws.send(Message::Text("ping".into())).await.is_err() {
                            return;
                        }
                        while let Some(Ok(msg)) = ws.next().await {
                            if let Message::Text(text) = msg {
                                received.lock().unwrap().push(text.to_string());
                            }
                        }
                    });
                }
            });

            format!("ws://{}", addr)
        }

        /// Greets with "ping", then drops the TCP stream without a close frame.
        fn spawn_vanishing_server() -> String {
            let runtime = &*crate::channel::TOKIO;
            let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
            let addr = listener.local_addr().unwrap();

            runtime.spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(async move {
                        if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                            let _ = ws.send(Message::Text("ping".into())).await;
                        }
                    });
                }
            });

            format!("ws://{}", addr)
        }

        #[test]
        fn test_message_then_disconnect() {
            let received = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
            let mut widget = SocketWidget::new(ChannelConfig::new(spawn_server(received.clone())));

            assert!(pump_until(&mut widget, |w| {
                w.binding().value().as_deref() == Some(MESSAGE_RECEIVED)
            }));
            assert_eq!(widget.status_line(), "Status: Message received");

            widget.send_message().unwrap();
            widget.send_message().unwrap();

            widget.disconnect();
            assert!(pump_until(&mut widget, |w| {
                w.binding().state() == BindingState::Completed
            }));
            assert_eq!(widget.binding().value().as_deref(), Some(COMPLETE));
            assert_eq!(widget.channel().ready_state(), ReadyState::Closed);

            // Frames sent before the close frame arrive before it.
            assert_eq!(
                *received.lock().unwrap(),
                vec![
                    r#"{"kind":"message","sequence":1}"#.to_string(),
                    r#"{"kind":"message","sequence":2}"#.to_string(),
                ]
            );
            assert!(widget.send_message().is_err());
        }

        #[test]
        fn test_dropped_connection_resubscribes() {
            let mut widget = SocketWidget::new(ChannelConfig::new(spawn_vanishing_server()));

            assert!(pump_until(&mut widget, |w| w.channel().connection_attempts() > 1));
            assert_eq!(widget.binding().value().as_deref(), Some(MESSAGE_RECEIVED));

            // Every reconnect is dropped again until the retry budget runs out.
            assert!(pump_until(&mut widget, |w| {
                w.binding().state() == BindingState::Errored
            }));
            assert_eq!(widget.channel().connection_attempts(), 4);
            assert_eq!(widget.binding().value().as_deref(), Some(MESSAGE_RECEIVED));
            assert_eq!(widget.channel().ready_state(), ReadyState::Closed);
        }
    }
}
