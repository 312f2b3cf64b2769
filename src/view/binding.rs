use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use crate::observable::{Observable, Observer, Subscription};

/// Rendered after every emission, whatever the payload was.
pub const MESSAGE_RECEIVED: &str = "Message received";
/// Rendered once the stream completes.
pub const COMPLETE: &str = "complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// No subscription.
    Idle,
    /// Subscribed and receiving.
    Subscribed,
    /// The stream failed; the subscription is finished.
    Errored,
    /// The stream completed; the subscription is finished.
    Completed,
}

struct Shared {
    value: RefCell<Option<String>>,
    state: Cell<BindingState>,
    emissions: Cell<u64>,
}

/// Keeps at most one live subscription per view and mirrors its
/// notifications into a render value.
///
/// Call [`bind`](Self::bind) on every render pass and
/// [`dispose`](Self::dispose) when the view goes away. Dropping the
/// binding disposes it as well.
pub struct ObserveBinding<O: ?Sized> {
    shared: Rc<Shared>,
    source: Option<Rc<O>>,
    subscription: Option<Subscription>,
}

impl<O: ?Sized> Default for ObserveBinding<O> {
    fn default() -> Self {
        Self {
            shared: Rc::new(Shared {
                value: RefCell::new(None),
                state: Cell::new(BindingState::Idle),
                emissions: Cell::new(0),
            }),
            source: None,
            subscription: None,
        }
    }
}

impl<O: ?Sized> ObserveBinding<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current render value, `None` until the first notification.
    pub fn value(&self) -> Option<String> {
        self.shared.value.borrow().clone()
    }

    pub fn state(&self) -> BindingState {
        self.shared.state.get()
    }

    /// Emissions seen by the current and previous subscriptions.
    pub fn emissions(&self) -> u64 {
        self.shared.emissions.get()
    }

    /// Unsubscribe and forget the bound stream. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            log::debug!("Disposing view subscription");
            subscription.unsubscribe();
        }
        self.source = None;
        self.shared.state.set(BindingState::Idle);
    }
}

impl<O> ObserveBinding<O>
where
    O: Observable + ?Sized,
    O::Error: Display,
{
    /// Render pass: observe `stream` and return the value to display.
    ///
    /// Binding the same stream instance again keeps the running
    /// subscription, even after it finished. A different instance replaces
    /// it, disposing the old one first.
    pub fn bind(&mut self, stream: &Rc<O>) -> Option<String> {
        if let Some(ref current) = self.source {
            if Rc::ptr_eq(current, stream) {
                return self.value();
            }
        }

        self.dispose();
        self.source = Some(stream.clone());
        self.shared.state.set(BindingState::Subscribed);

        let (next, error, complete) = (
            self.shared.clone(),
            self.shared.clone(),
            self.shared.clone(),
        );
        let observer = Observer::new(move |_| {
            log::info!("{}", MESSAGE_RECEIVED);
            next.emissions.set(next.emissions.get() + 1);
            *next.value.borrow_mut() = Some(MESSAGE_RECEIVED.to_string());
        })
        .on_error(move |e: O::Error| {
            log::error!("Stream error: {}", e);
            error.state.set(BindingState::Errored);
        })
        .on_complete(move || {
            log::info!("Stream {}", COMPLETE);
            *complete.value.borrow_mut() = Some(COMPLETE.to_string());
            complete.state.set(BindingState::Completed);
        });

        self.subscription = Some(stream.subscribe(observer));
        self.value()
    }
}

impl<O: ?Sized> Drop for ObserveBinding<O> {
    fn drop(&mut self) {
        self.dispose();
    }
}
