//! Socket Status Widget
//!
//! Composes a [`WebSocketChannel`](crate::channel::WebSocketChannel), its
//! derived status stream and an [`ObserveBinding`](crate::view::ObserveBinding)
//! into the state behind the widget: two actions and one status line.
//! No Bevy dependencies; see [`crate::widget_bevy`] for rendering.

mod socket_widget;

pub use socket_widget::{DynStatus, OutgoingMessage, SocketWidget, StatusStream};
