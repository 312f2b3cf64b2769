//! # Socket Status Widget for Bevy
//!
//! A WebSocket presented as a push-based stream, a view binding that
//! mirrors any stream into render text, and a Bevy UI widget built from
//! the two.
//!
//! ## Example
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_socket_status::{ChannelConfig, SocketWidgetBundle, SocketWidgetPlugin};
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(SocketWidgetPlugin::new(ChannelConfig::new(
//!             "wss://javascript.info/article/websocket/demo/hello",
//!         )))
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands) {
//!     commands.spawn(Camera2d);
//!     commands.spawn(SocketWidgetBundle::new(Node {
//!         width: Val::Percent(100.0),
//!         justify_content: JustifyContent::Center,
//!         ..default()
//!     }));
//! }
//! ```
pub mod channel;
pub mod observable;
pub mod view;
pub mod widget;
pub mod widget_bevy;

pub use channel::{ChannelConfig, ChannelError, LifecycleHooks, Payload, ReadyState, WebSocketChannel};
pub use observable::{Observable, ObservableExt, Observer, Subscription};
pub use view::ObserveBinding;
pub use widget::SocketWidget;
pub use widget_bevy::{SocketWidgetBundle, SocketWidgetPlugin};
