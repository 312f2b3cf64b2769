//! Push-based Streams
//!
//! A small observer-pattern core: producers push values to subscribers
//! through [`Subscriber`], consumers register an [`Observer`] and get a
//! [`Subscription`] back to stop delivery.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Producers that
//! live on other threads hand their events to the owning thread first,
//! see [`crate::channel::WebSocketChannel::pump`].

mod observer;
mod operators;
mod subject;
mod subscription;

pub use observer::{Observer, Subscriber};
pub use operators::{ObservableExt, Retry, Tap};
pub use subject::Subject;
pub use subscription::Subscription;

use std::rc::Rc;

/// A source of values that can be subscribed to.
pub trait Observable {
    type Item: 'static;
    type Error: 'static;

    /// Start delivering notifications to `observer`.
    fn subscribe(&self, observer: Observer<Self::Item, Self::Error>) -> Subscription;
}

impl<O: Observable + ?Sized> Observable for Rc<O> {
    type Item = O::Item;
    type Error = O::Error;

    fn subscribe(&self, observer: Observer<Self::Item, Self::Error>) -> Subscription {
        (**self).subscribe(observer)
    }
}

/// Observable backed by a producer closure that runs once per subscription.
pub struct Create<T, E> {
    producer: Box<dyn Fn(Subscriber<T, E>)>,
}

impl<T: 'static, E: 'static> Observable for Create<T, E> {
    type Item = T;
    type Error = E;

    fn subscribe(&self, observer: Observer<T, E>) -> Subscription {
        let subscriber = Subscriber::new(observer);
        let subscription = subscriber.subscription().clone();
        (self.producer)(subscriber);
        subscription
    }
}

/// Build an observable from a producer closure.
///
/// The producer receives the [`Subscriber`] for every new subscription and
/// may keep it to push values later, or register teardown logic with
/// `subscriber.subscription().add(..)`.
pub fn create<T, E, F>(producer: F) -> Create<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(Subscriber<T, E>) + 'static,
{
    Create {
        producer: Box::new(producer),
    }
}
