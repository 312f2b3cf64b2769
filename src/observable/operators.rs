use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::observable::{Observable, Observer, Subscriber, Subscription};

/// Composition operators available on every [`Observable`].
pub trait ObservableExt: Observable + Sized {
    /// Run `f` on every emission without changing the value.
    fn tap<F>(self, f: F) -> Tap<Self, F>
    where
        F: Fn(&Self::Item) + 'static,
    {
        Tap {
            source: self,
            f: Rc::new(f),
        }
    }

    /// Resubscribe on error, at most `count` times after the first failure.
    ///
    /// The budget is shared by the whole subscription and is not refilled by
    /// successful emissions. Once it is spent the error is forwarded.
    fn retry(self, count: u32) -> Retry<Self> {
        Retry {
            source: Rc::new(self),
            count,
        }
    }
}

impl<O: Observable> ObservableExt for O {}

pub struct Tap<S, F> {
    source: S,
    f: Rc<F>,
}

impl<S, F> Observable for Tap<S, F>
where
    S: Observable,
    F: Fn(&S::Item) + 'static,
{
    type Item = S::Item;
    type Error = S::Error;

    fn subscribe(&self, observer: Observer<S::Item, S::Error>) -> Subscription {
        let Observer {
            mut next,
            error,
            complete,
        } = observer;
        let f = self.f.clone();

        self.source.subscribe(Observer {
            next: Box::new(move |value: S::Item| {
                f(&value);
                next(value);
            }),
            error,
            complete,
        })
    }
}

pub struct Retry<S> {
    source: Rc<S>,
    count: u32,
}

struct RetryState<S: Observable> {
    source: Rc<S>,
    remaining: Cell<u32>,
    attempts: Cell<u32>,
    downstream: Subscriber<S::Item, S::Error>,
    inner: RefCell<Option<Subscription>>,
}

impl<S> Observable for Retry<S>
where
    S: Observable + 'static,
{
    type Item = S::Item;
    type Error = S::Error;

    fn subscribe(&self, observer: Observer<S::Item, S::Error>) -> Subscription {
        let downstream = Subscriber::new(observer);
        let subscription = downstream.subscription().clone();

        let state = Rc::new(RetryState {
            source: self.source.clone(),
            remaining: Cell::new(self.count),
            attempts: Cell::new(0),
            downstream,
            inner: RefCell::new(None),
        });

        let teardown_state = Rc::downgrade(&state);
        subscription.add(move || {
            let Some(state) = teardown_state.upgrade() else {
                return;
            };
            let inner = state.inner.borrow_mut().take();
            if let Some(inner) = inner {
                inner.unsubscribe();
            }
        });

        subscribe_attempt(state);
        subscription
    }
}

fn subscribe_attempt<S>(state: Rc<RetryState<S>>)
where
    S: Observable + 'static,
{
    if state.downstream.is_closed() {
        return;
    }
    state.attempts.set(state.attempts.get() + 1);
    log::debug!("Subscribing to source (attempt {})", state.attempts.get());

    let next_downstream = state.downstream.clone();
    let complete_downstream = state.downstream.clone();
    let error_state = state.clone();

    let observer = Observer {
        next: Box::new(move |value: S::Item| next_downstream.next(value)),
        error: Box::new(move |error: S::Error| {
            let remaining = error_state.remaining.get();
            if remaining == 0 {
                log::debug!(
                    "Retry budget exhausted after {} attempts",
                    error_state.attempts.get()
                );
                error_state.downstream.error(error);
                return;
            }
            error_state.remaining.set(remaining - 1);
            log::warn!(
                "Stream failed, resubscribing ({} retries left)",
                remaining - 1
            );
            subscribe_attempt(error_state.clone());
        }),
        complete: Box::new(move || complete_downstream.complete()),
    };

    let inner = state.source.subscribe(observer);

    // A synchronous failure may already have started the next attempt;
    // only a live subscription is worth keeping.
    if inner.is_closed() {
        return;
    }
    if state.downstream.is_closed() {
        inner.unsubscribe();
        return;
    }
    *state.inner.borrow_mut() = Some(inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{Subject, create};

    fn failing_source(attempts: Rc<Cell<u32>>) -> impl Observable<Item = u32, Error = String> {
        create(move |subscriber: Subscriber<u32, String>| {
            attempts.set(attempts.get() + 1);
            subscriber.error(format!("failure {}", attempts.get()));
        })
    }

    #[test]
    fn test_tap_sees_every_value_unchanged() {
        let tapped = Rc::new(RefCell::new(Vec::new()));
        let received = Rc::new(RefCell::new(Vec::new()));

        let subject = Subject::<u32, String>::new();
        let taps = tapped.clone();
        let stream = subject.clone().tap(move |v| taps.borrow_mut().push(*v));

        let out = received.clone();
        let _subscription = stream.subscribe(Observer::new(move |v| out.borrow_mut().push(v)));

        subject.next(1);
        subject.next(2);

        assert_eq!(*tapped.borrow(), vec![1, 2]);
        assert_eq!(*received.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_retry_subscribes_four_times_then_errors() {
        let attempts = Rc::new(Cell::new(0));
        let errors = Rc::new(RefCell::new(Vec::<String>::new()));

        let stream = failing_source(attempts.clone()).retry(3);
        let seen = errors.clone();
        let subscription =
            stream.subscribe(Observer::new(|_| {}).on_error(move |e| seen.borrow_mut().push(e)));

        assert_eq!(attempts.get(), 4);
        assert_eq!(*errors.borrow(), vec!["failure 4".to_string()]);
        assert!(subscription.is_closed());
    }

    #[test]
    fn test_retry_zero_forwards_first_error() {
        let attempts = Rc::new(Cell::new(0));
        let failed = Rc::new(Cell::new(false));

        let flag = failed.clone();
        let _subscription = failing_source(attempts.clone())
            .retry(0)
            .subscribe(Observer::new(|_| {}).on_error(move |_| flag.set(true)));

        assert_eq!(attempts.get(), 1);
        assert!(failed.get());
    }

    #[test]
    fn test_retry_recovers_and_keeps_emitting() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let source = create(move |subscriber: Subscriber<&'static str, String>| {
            counter.set(counter.get() + 1);
            if counter.get() < 3 {
                subscriber.error("not yet".to_string());
            } else {
                subscriber.next("connected");
                subscriber.complete();
            }
        });

        let events = Rc::new(RefCell::new(Vec::new()));
        let next_events = events.clone();
        let done_events = events.clone();
        let _subscription = source.retry(3).subscribe(
            Observer::new(move |v: &'static str| next_events.borrow_mut().push(v.to_string()))
                .on_complete(move || done_events.borrow_mut().push("complete".to_string())),
        );

        assert_eq!(attempts.get(), 3);
        assert_eq!(*events.borrow(), vec!["connected", "complete"]);
    }

    #[test]
    fn test_retry_spends_budget_on_replayed_error() {
        let subject = Subject::<u32, String>::new();
        let errors = Rc::new(Cell::new(0));

        let seen = errors.clone();
        let subscription = subject
            .clone()
            .retry(1)
            .subscribe(Observer::new(|_| {}).on_error(move |_| seen.set(seen.get() + 1)));

        assert_eq!(subject.observer_count(), 1);

        // The resubscription lands on a stopped subject, which replays the
        // error straight away.
        subject.error("first".to_string());
        assert_eq!(errors.get(), 1);
        assert!(subscription.is_closed());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_retry_and_inner() {
        let subject = Subject::<u32, String>::new();
        let received = Rc::new(Cell::new(0));

        let counter = received.clone();
        let subscription = subject
            .clone()
            .retry(3)
            .subscribe(Observer::new(move |_| counter.set(counter.get() + 1)));

        subject.next(1);
        subscription.unsubscribe();
        subject.next(2);

        assert_eq!(received.get(), 1);
        assert_eq!(subject.observer_count(), 0);
    }
}
