//! View Binding
//!
//! Bridges a push-based stream into a value a view can render, tied to
//! the view's render and teardown cycle.

mod binding;

pub use binding::{BindingState, COMPLETE, MESSAGE_RECEIVED, ObserveBinding};
