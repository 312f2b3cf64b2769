use std::cell::RefCell;
use std::rc::Rc;

use crate::observable::{Observable, Observer, Subscriber, Subscription};

enum Stopped<E> {
    Errored(E),
    Completed,
}

struct SubjectInner<T, E> {
    subscribers: RefCell<Vec<Subscriber<T, E>>>,
    stopped: RefCell<Option<Stopped<E>>>,
}

/// Multicast registry: every notification goes to all live subscribers.
///
/// After `error` or `complete` the subject is stopped and late subscribers
/// receive the terminal notification immediately.
pub struct Subject<T, E> {
    inner: Rc<SubjectInner<T, E>>,
}

impl<T, E> Clone for Subject<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Default for Subject<T, E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                subscribers: RefCell::new(Vec::new()),
                stopped: RefCell::new(None),
            }),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Subject<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.borrow().is_some()
    }

    /// Number of subscribers that have not unsubscribed yet.
    pub fn observer_count(&self) -> usize {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        subscribers.retain(|s| !s.is_closed());
        subscribers.len()
    }

    /// Register an existing subscriber.
    pub fn add(&self, subscriber: Subscriber<T, E>) {
        let replay = match &*self.inner.stopped.borrow() {
            Some(Stopped::Errored(error)) => Some(Some(error.clone())),
            Some(Stopped::Completed) => Some(None),
            None => None,
        };
        match replay {
            Some(Some(error)) => subscriber.error(error),
            Some(None) => subscriber.complete(),
            None => self.inner.subscribers.borrow_mut().push(subscriber),
        }
    }

    pub fn next(&self, value: T) {
        if self.is_stopped() {
            return;
        }
        for subscriber in self.snapshot() {
            subscriber.next(value.clone());
        }
    }

    pub fn error(&self, error: E) {
        if self.is_stopped() {
            return;
        }
        *self.inner.stopped.borrow_mut() = Some(Stopped::Errored(error.clone()));
        for subscriber in self.drain() {
            subscriber.error(error.clone());
        }
    }

    pub fn complete(&self) {
        if self.is_stopped() {
            return;
        }
        *self.inner.stopped.borrow_mut() = Some(Stopped::Completed);
        for subscriber in self.drain() {
            subscriber.complete();
        }
    }

    fn snapshot(&self) -> Vec<Subscriber<T, E>> {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| !s.is_closed())
            .cloned()
            .collect()
    }

    fn drain(&self) -> Vec<Subscriber<T, E>> {
        std::mem::take(&mut *self.inner.subscribers.borrow_mut())
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Observable for Subject<T, E> {
    type Item = T;
    type Error = E;

    fn subscribe(&self, observer: Observer<T, E>) -> Subscription {
        let subscriber = Subscriber::new(observer);
        let subscription = subscriber.subscription().clone();
        self.add(subscriber);
        subscription
    }
}
