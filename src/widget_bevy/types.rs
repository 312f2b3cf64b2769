use bevy::prelude::*;

/// Button background (`#1a1a1a`).
pub const BUTTON_BACKGROUND: Color = Color::srgb(0.102, 0.102, 0.102);
/// Button border while hovered or pressed (`#646cff`).
pub const BUTTON_HOVER_BORDER: Color = Color::srgb(0.392, 0.424, 1.0);

/// Marker component for the widget container
#[derive(Component)]
pub struct SocketWidgetRoot;

/// Marker component for the "Send message" button
#[derive(Component)]
pub struct SendMessageButton;

/// Marker component for the "Disconnect" button
#[derive(Component)]
pub struct DisconnectButton;

/// Marker component for the text span showing the stream status
#[derive(Component)]
pub struct StatusText;

pub struct SocketWidgetBundle;

impl SocketWidgetBundle {
    /// The widget tree under `root_node`: send button, status line,
    /// disconnect button.
    pub fn new(root_node: Node) -> impl Bundle {
        (
            root_node,
            SocketWidgetRoot,
            children![(
                Node {
                    flex_direction: FlexDirection::Column,
                    align_items: AlignItems::Center,
                    row_gap: Val::Px(16.0),
                    padding: UiRect::all(Val::Px(32.0)),
                    ..default()
                },
                children![
                    widget_button("Send message", SendMessageButton),
                    (
                        Text::new("Status: "),
                        children![(TextSpan::default(), StatusText)],
                    ),
                    widget_button("Disconnect", DisconnectButton),
                ],
            )],
        )
    }
}

fn widget_button(label: &str, marker: impl Component) -> impl Bundle {
    (
        Button,
        marker,
        Node {
            padding: UiRect::axes(Val::Px(19.2), Val::Px(9.6)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        BorderColor::all(Color::NONE),
        BackgroundColor(BUTTON_BACKGROUND),
        children![(Text::new(label), TextFont::from_font_size(16.0))],
    )
}
