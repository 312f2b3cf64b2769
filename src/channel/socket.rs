use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::mpsc;

use tokio_tungstenite::tungstenite::Message;

use crate::channel::transport::{CLOSE_NORMAL, Connection, EventSender, TransportEvent};
use crate::channel::{ChannelConfig, ChannelError, ChannelResult};
use crate::observable::{Observable, Observer, Subject, Subscriber, Subscription};

/// Lifecycle state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Nothing subscribed yet, no socket.
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    /// The last connection failed.
    Errored,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Idle => "idle",
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
            ReadyState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// A message as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }

    pub(crate) fn into_message(self) -> Message {
        match self {
            Payload::Text(text) => Message::Text(text.into()),
            Payload::Binary(data) => Message::Binary(data.into()),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Binary(data)
    }
}

/// Details of a finished connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
    /// `false` when the connection dropped without a close handshake
    /// (server process killed, network down); `code` is 1006 then.
    pub was_clean: bool,
}

/// Optional callbacks fired on lifecycle transitions.
#[derive(Default)]
pub struct LifecycleHooks {
    on_open: Option<Box<dyn Fn()>>,
    on_closing: Option<Box<dyn Fn()>>,
    on_close: Option<Box<dyn Fn(&CloseEvent)>>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The handshake completed.
    pub fn on_open(mut self, f: impl Fn() + 'static) -> Self {
        self.on_open = Some(Box::new(f));
        self
    }

    /// `close()` was called; the peer has not acknowledged yet.
    pub fn on_closing(mut self, f: impl Fn() + 'static) -> Self {
        self.on_closing = Some(Box::new(f));
        self
    }

    /// A connection ended, cleanly or not.
    pub fn on_close(mut self, f: impl Fn(&CloseEvent) + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    fn opened(&self) {
        if let Some(ref f) = self.on_open {
            f();
        }
    }

    fn closing(&self) {
        if let Some(ref f) = self.on_closing {
            f();
        }
    }

    fn closed(&self, event: &CloseEvent) {
        if let Some(ref f) = self.on_close {
            f(event);
        }
    }
}

struct ChannelInner {
    config: ChannelConfig,
    hooks: LifecycleHooks,
    state: Cell<ReadyState>,
    connection: RefCell<Option<Connection>>,
    /// Subscribers of the current connection. Replaced whenever a
    /// connection ends so the next subscriber starts fresh.
    subject: RefCell<Subject<Payload, ChannelError>>,
    events_tx: EventSender,
    events_rx: mpsc::Receiver<(u64, TransportEvent)>,
    attempts: Cell<u64>,
}

/// A WebSocket endpoint presented as a multicast push-based stream.
///
/// The first subscriber opens the connection; later subscribers share it.
/// When the last subscriber leaves, the connection is closed. Hooks and
/// observers only run inside [`pump`](Self::pump).
#[derive(Clone)]
pub struct WebSocketChannel {
    inner: Rc<ChannelInner>,
}

impl WebSocketChannel {
    /// Prepare a channel. Nothing connects until the stream is subscribed,
    /// and a bad address is reported through the stream, not here.
    pub fn new(config: ChannelConfig, hooks: LifecycleHooks) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            inner: Rc::new(ChannelInner {
                config,
                hooks,
                state: Cell::new(ReadyState::Idle),
                connection: RefCell::new(None),
                subject: RefCell::new(Subject::new()),
                events_tx,
                events_rx,
                attempts: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.get()
    }

    /// Number of connections opened so far.
    pub fn connection_attempts(&self) -> u64 {
        self.inner.attempts.get()
    }

    /// Live subscribers sharing the current connection.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subject.borrow().observer_count()
    }

    /// Inbound messages, verbatim.
    pub fn stream(&self) -> ChannelStream {
        ChannelStream {
            channel: self.clone(),
        }
    }

    /// Queue `payload` for transmission.
    ///
    /// Only valid while [`ReadyState::Open`]. In any other state the frame
    /// would be dropped by the transport, so this returns
    /// [`ChannelError::NotOpen`] instead of pretending it was sent.
    pub fn send(&self, payload: impl Into<Payload>) -> ChannelResult<()> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            log::warn!("[WebSocket] send() while {}, message dropped", state);
            return Err(ChannelError::NotOpen(state));
        }

        match self.inner.connection.borrow().as_ref() {
            Some(connection) => connection.send(payload.into()),
            None => Err(ChannelError::NotOpen(state)),
        }
    }

    /// Start a graceful shutdown: `on_closing` now, `on_close` and stream
    /// completion once the peer acknowledges.
    pub fn close(&self) {
        let state = self.ready_state();
        if !matches!(state, ReadyState::Connecting | ReadyState::Open) {
            log::debug!("[WebSocket] close() ignored while {}", state);
            return;
        }

        self.inner.state.set(ReadyState::Closing);
        self.inner.hooks.closing();

        if let Some(connection) = self.inner.connection.borrow().as_ref() {
            connection.close(CLOSE_NORMAL, "");
        }
    }

    /// Dispatch queued transport events on the calling thread, in order.
    /// Returns how many events were handled.
    pub fn pump(&self) -> usize {
        let mut dispatched = 0;
        while let Ok((id, event)) = self.inner.events_rx.try_recv() {
            self.dispatch(id, event);
            dispatched += 1;
        }
        dispatched
    }

    fn dispatch(&self, id: u64, event: TransportEvent) {
        let current = self.current_connection_id() == Some(id);

        match event {
            TransportEvent::Open => {
                if !current {
                    log::debug!("[WebSocket {}] Ignoring open of a superseded connection", id);
                    return;
                }
                // close() during the handshake wins.
                if self.ready_state() == ReadyState::Closing {
                    return;
                }
                self.inner.state.set(ReadyState::Open);
                self.inner.hooks.opened();
            }
            TransportEvent::Message(payload) => {
                if !current {
                    return;
                }
                let subject = self.inner.subject.borrow().clone();
                subject.next(payload);
            }
            TransportEvent::Error(error) => {
                if !current {
                    log::debug!("[WebSocket {}] Ignoring error of a superseded connection: {}", id, error);
                    return;
                }
                self.inner.state.set(ReadyState::Errored);
                self.detach().error(error);
            }
            TransportEvent::Closed(event) => {
                self.inner.hooks.closed(&event);

                if current {
                    self.inner.state.set(ReadyState::Closed);
                    let subject = self.detach();
                    if event.was_clean {
                        subject.complete();
                    } else {
                        subject.error(ChannelError::ClosedUncleanly {
                            code: event.code,
                            reason: event.reason,
                        });
                    }
                } else if self.current_connection_id().is_none()
                    && self.ready_state() != ReadyState::Errored
                {
                    self.inner.state.set(ReadyState::Closed);
                }
            }
        }
    }

    fn current_connection_id(&self) -> Option<u64> {
        self.inner.connection.borrow().as_ref().map(Connection::id)
    }

    /// Drop the current connection and hand back its subscribers.
    fn detach(&self) -> Subject<Payload, ChannelError> {
        self.inner.connection.borrow_mut().take();
        self.inner.subject.replace(Subject::new())
    }

    fn ensure_connected(&self) {
        if self.inner.connection.borrow().is_some() {
            return;
        }

        let id = self.inner.attempts.get() + 1;
        self.inner.attempts.set(id);
        self.inner.state.set(ReadyState::Connecting);

        let connection = Connection::open(id, &self.inner.config, self.inner.events_tx.clone());
        *self.inner.connection.borrow_mut() = Some(connection);
    }

    /// Close the connection once nobody listens to it anymore.
    fn release(&self) {
        if self.subscriber_count() > 0 {
            return;
        }
        let connection = self.inner.connection.borrow_mut().take();
        if let Some(connection) = connection {
            log::info!("[WebSocket {}] Last subscriber left, closing", connection.id());
            connection.close(CLOSE_NORMAL, "");
            self.inner.state.set(ReadyState::Closing);
        }
    }
}

/// The inbound side of a [`WebSocketChannel`].
#[derive(Clone)]
pub struct ChannelStream {
    channel: WebSocketChannel,
}

impl Observable for ChannelStream {
    type Item = Payload;
    type Error = ChannelError;

    fn subscribe(&self, observer: Observer<Payload, ChannelError>) -> Subscription {
        let subscriber = Subscriber::new(observer);
        let subscription = subscriber.subscription().clone();

        let subject = self.channel.inner.subject.borrow().clone();
        subject.add(subscriber);
        self.channel.ensure_connected();

        let channel = Rc::downgrade(&self.channel.inner);
        subscription.add(move || {
            if let Some(inner) = channel.upgrade() {
                WebSocketChannel { inner }.release();
            }
        });

        subscription
    }
}
