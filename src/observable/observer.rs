use std::cell::RefCell;
use std::rc::Rc;

use crate::observable::Subscription;

/// Callbacks for the three kinds of notification.
pub struct Observer<T, E> {
    pub(crate) next: Box<dyn FnMut(T)>,
    pub(crate) error: Box<dyn FnMut(E)>,
    pub(crate) complete: Box<dyn FnMut()>,
}

impl<T: 'static, E: 'static> Observer<T, E> {
    pub fn new(next: impl FnMut(T) + 'static) -> Self {
        Self {
            next: Box::new(next),
            error: Box::new(|_: E| log::warn!("Unhandled stream error dropped")),
            complete: Box::new(|| {}),
        }
    }

    pub fn on_error(mut self, error: impl FnMut(E) + 'static) -> Self {
        self.error = Box::new(error);
        self
    }

    pub fn on_complete(mut self, complete: impl FnMut() + 'static) -> Self {
        self.complete = Box::new(complete);
        self
    }
}

enum Terminal<E> {
    Error(E),
    Complete,
}

/// Producer-side handle used to push notifications to one observer.
///
/// Once `error`, `complete` or `unsubscribe` has happened nothing else is
/// delivered. Terminal notifications close the subscription (running its
/// teardowns) before the observer callback runs. A terminal notification
/// raised while this observer's `next` is running is held back and
/// delivered once that call returns.
pub struct Subscriber<T, E> {
    observer: Rc<RefCell<Option<Observer<T, E>>>>,
    pending: Rc<RefCell<Option<Terminal<E>>>>,
    subscription: Subscription,
}

impl<T, E> Clone for Subscriber<T, E> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            pending: self.pending.clone(),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T: 'static, E: 'static> Subscriber<T, E> {
    pub fn new(observer: Observer<T, E>) -> Self {
        let observer = Rc::new(RefCell::new(Some(observer)));
        let subscription = Subscription::new();

        // Release the callbacks on unsubscribe. If a callback is running
        // right now the slot is borrowed; it is cleared after the call.
        let slot = observer.clone();
        subscription.add(move || {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                slot.take();
            }
        });

        Self {
            observer,
            pending: Rc::new(RefCell::new(None)),
            subscription,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    pub fn next(&self, value: T) {
        if self.is_closed() {
            return;
        }
        let Ok(mut slot) = self.observer.try_borrow_mut() else {
            log::warn!("Re-entrant emission dropped");
            return;
        };
        if let Some(observer) = slot.as_mut() {
            (observer.next)(value);
        }

        let pending = self.pending.borrow_mut().take();
        match pending {
            Some(terminal) => {
                let observer = slot.take();
                drop(slot);
                if let Some(mut observer) = observer {
                    match terminal {
                        Terminal::Error(error) => (observer.error)(error),
                        Terminal::Complete => (observer.complete)(),
                    }
                }
            }
            None if self.is_closed() => {
                slot.take();
            }
            None => {}
        }
    }

    pub fn error(&self, error: E) {
        self.terminate(Terminal::Error(error));
    }

    pub fn complete(&self) {
        self.terminate(Terminal::Complete);
    }

    fn terminate(&self, terminal: Terminal<E>) {
        if self.is_closed() {
            return;
        }
        let observer = match self.observer.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                // Raised from inside `next`; delivered when it returns.
                *self.pending.borrow_mut() = Some(terminal);
                self.subscription.unsubscribe();
                return;
            }
        };
        self.subscription.unsubscribe();
        if let Some(mut observer) = observer {
            match terminal {
                Terminal::Error(error) => (observer.error)(error),
                Terminal::Complete => (observer.complete)(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recording() -> (Rc<RefCell<Vec<String>>>, Observer<u32, String>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let next_log = log.clone();
        let error_log = log.clone();
        let complete_log = log.clone();
        let observer = Observer::new(move |v: u32| next_log.borrow_mut().push(format!("next {v}")))
            .on_error(move |e: String| error_log.borrow_mut().push(format!("error {e}")))
            .on_complete(move || complete_log.borrow_mut().push("complete".to_string()));
        (log, observer)
    }

    #[test]
    fn test_nothing_delivered_after_complete() {
        let (log, observer) = recording();
        let subscriber = Subscriber::new(observer);

        subscriber.next(1);
        subscriber.complete();
        subscriber.next(2);
        subscriber.error("late".to_string());
        subscriber.complete();

        assert_eq!(*log.borrow(), vec!["next 1", "complete"]);
        assert!(subscriber.is_closed());
    }

    #[test]
    fn test_nothing_delivered_after_unsubscribe() {
        let (log, observer) = recording();
        let subscriber = Subscriber::new(observer);

        subscriber.subscription().unsubscribe();
        subscriber.next(1);
        subscriber.complete();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_error_closes_before_callback() {
        let subscription_closed = Rc::new(Cell::new(false));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let seen = subscription_closed.clone();
        let handle = slot.clone();
        let observer = Observer::new(|_: u32| {}).on_error(move |_: String| {
            let closed = handle.borrow().as_ref().map(|s| s.is_closed()).unwrap_or(false);
            seen.set(closed);
        });

        let subscriber = Subscriber::new(observer);
        *slot.borrow_mut() = Some(subscriber.subscription().clone());
        subscriber.error("boom".to_string());

        assert!(subscription_closed.get());
    }

    #[test]
    fn test_unsubscribe_from_inside_next() {
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(Cell::new(0));

        let handle = slot.clone();
        let counter = count.clone();
        let subscriber = Subscriber::<u32, String>::new(Observer::new(move |_| {
            counter.set(counter.get() + 1);
            if let Some(subscription) = handle.borrow().as_ref() {
                subscription.unsubscribe();
            }
        }));
        *slot.borrow_mut() = Some(subscriber.subscription().clone());

        subscriber.next(1);
        subscriber.next(2);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_complete_from_inside_next_is_delivered_after_it() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Subscriber<u32, String>>>> = Rc::new(RefCell::new(None));

        let next_log = log.clone();
        let complete_log = log.clone();
        let handle = slot.clone();
        let observer = Observer::new(move |v: u32| {
            if let Some(subscriber) = handle.borrow().as_ref() {
                subscriber.complete();
                subscriber.complete();
                subscriber.next(v + 100);
            }
            next_log.borrow_mut().push(format!("next {v}"));
        })
        .on_complete(move || complete_log.borrow_mut().push("complete".to_string()));

        let subscriber = Subscriber::new(observer);
        *slot.borrow_mut() = Some(subscriber.clone());

        subscriber.next(1);
        subscriber.next(2);
        subscriber.complete();

        assert_eq!(*log.borrow(), vec!["next 1", "complete"]);
        assert!(subscriber.is_closed());
        slot.borrow_mut().take();
    }

    #[test]
    fn test_error_from_inside_next_is_delivered_after_it() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Subscriber<u32, String>>>> = Rc::new(RefCell::new(None));

        let next_log = log.clone();
        let error_log = log.clone();
        let handle = slot.clone();
        let observer = Observer::new(move |v: u32| {
            if let Some(subscriber) = handle.borrow().as_ref() {
                subscriber.error(format!("bad {v}"));
            }
            next_log.borrow_mut().push(format!("next {v}"));
        })
        .on_error(move |e: String| error_log.borrow_mut().push(format!("error {e}")));

        let subscriber = Subscriber::new(observer);
        *slot.borrow_mut() = Some(subscriber.clone());

        subscriber.next(7);
        subscriber.error("late".to_string());

        assert_eq!(*log.borrow(), vec!["next 7", "error bad 7"]);
        slot.borrow_mut().take();
    }
}
