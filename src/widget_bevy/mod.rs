//! Bevy Socket Widget Plugin
//!
//! Renders a [`SocketWidget`](crate::widget::SocketWidget) with Bevy UI:
//! a "Send message" button, a status line and a "Disconnect" button.
//! The widget lives in a non-send resource because the stream core is
//! single-threaded; all of its callbacks run on the main thread.

mod plugin;
mod systems;
mod types;

pub use plugin::SocketWidgetPlugin;
pub use systems::*;
pub use types::*;
