use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Teardown = Box<dyn FnOnce()>;

#[derive(Default)]
struct SubscriptionInner {
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Teardown>>,
}

/// Handle to an active listening relationship.
///
/// Cheap to clone; all clones refer to the same subscription.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Register teardown logic. Runs immediately if already closed.
    pub fn add(&self, teardown: impl FnOnce() + 'static) {
        if self.is_closed() {
            teardown();
            return;
        }
        self.inner.teardowns.borrow_mut().push(Box::new(teardown));
    }

    /// Close the subscription and run its teardowns. Idempotent.
    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
    }

    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("teardowns", &self.inner.teardowns.borrow().len())
            .finish()
    }
}
