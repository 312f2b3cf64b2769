use bevy::prelude::*;

use crate::channel::ChannelConfig;
use crate::widget::SocketWidget;
use crate::widget_bevy::systems::*;

/// Adds the socket widget state and the systems that drive it.
///
/// Spawn a [`SocketWidgetBundle`](crate::widget_bevy::SocketWidgetBundle)
/// to show it; the connection opens on the first render.
pub struct SocketWidgetPlugin {
    config: ChannelConfig,
}

impl SocketWidgetPlugin {
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }
}

impl Default for SocketWidgetPlugin {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

impl Plugin for SocketWidgetPlugin {
    fn build(&self, app: &mut App) {
        log::info!("Building socket widget plugin for {}", self.config.url);

        app.insert_non_send_resource(SocketWidget::new(self.config.clone()))
            .add_systems(
                Update,
                (
                    pump_socket_channel,
                    handle_widget_buttons,
                    style_widget_buttons,
                    render_socket_status,
                    unmount_removed_status_views,
                )
                    .chain(),
            );

        log::info!("Socket widget plugin configured");
    }
}
