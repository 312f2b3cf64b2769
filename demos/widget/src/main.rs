use bevy::prelude::*;
use bevy_socket_status::{ChannelConfig, SocketWidgetBundle, SocketWidgetPlugin};

fn main() {
    // Endpoint can be overridden with SOCKET_WIDGET_CONFIG='{"url": "ws://..."}'
    let config = std::env::var("SOCKET_WIDGET_CONFIG")
        .ok()
        .and_then(|json| match ChannelConfig::from_json(&json) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Ignoring SOCKET_WIDGET_CONFIG: {}", e);
                None
            }
        })
        .unwrap_or_default();

    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(SocketWidgetPlugin::new(config))
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);

    // Centred card, max 1280px wide
    commands.spawn(SocketWidgetBundle::new(Node {
        width: Val::Percent(100.0),
        max_width: Val::Px(1280.0),
        margin: UiRect::horizontal(Val::Auto),
        padding: UiRect::all(Val::Px(32.0)),
        justify_content: JustifyContent::Center,
        ..default()
    }));
}
