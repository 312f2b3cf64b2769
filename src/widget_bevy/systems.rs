use bevy::prelude::*;

use crate::widget::SocketWidget;
use crate::widget_bevy::types::*;

/// Dispatch socket events queued since the last frame.
pub fn pump_socket_channel(widget: NonSend<SocketWidget>) {
    let dispatched = widget.pump();
    if dispatched > 0 {
        log::debug!("Dispatched {} socket events", dispatched);
    }
}

/// Forward button presses to the channel
pub fn handle_widget_buttons(
    query: Query<
        (&Interaction, Has<SendMessageButton>, Has<DisconnectButton>),
        (Changed<Interaction>, With<Button>),
    >,
    widget: NonSend<SocketWidget>,
) {
    for (interaction, is_send, is_disconnect) in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }

        if is_send {
            if let Err(e) = widget.send_message() {
                log::warn!("Send message failed: {}", e);
            }
        } else if is_disconnect {
            log::info!("Disconnect pressed");
            widget.disconnect();
        }
    }
}

pub fn style_widget_buttons(
    mut query: Query<
        (&Interaction, &mut BorderColor),
        (
            Changed<Interaction>,
            Or<(With<SendMessageButton>, With<DisconnectButton>)>,
        ),
    >,
) {
    for (interaction, mut border) in &mut query {
        *border = match interaction {
            Interaction::Hovered | Interaction::Pressed => BorderColor::all(BUTTON_HOVER_BORDER),
            Interaction::None => BorderColor::all(Color::NONE),
        };
    }
}

/// Render pass: bind the status stream and mirror its value into the
/// status span. Skipped while no status view is mounted.
pub fn render_socket_status(
    mut widget: NonSendMut<SocketWidget>,
    mut spans: Query<&mut TextSpan, With<StatusText>>,
) {
    if spans.is_empty() {
        return;
    }

    let status = widget.render().unwrap_or_default();
    for mut span in &mut spans {
        if span.0 != status {
            log::debug!("Status text: {}", status);
            span.0 = status.clone();
        }
    }
}

/// Dispose the subscription once the last status view is gone.
pub fn unmount_removed_status_views(
    mut removed: RemovedComponents<StatusText>,
    remaining: Query<(), With<StatusText>>,
    mut widget: NonSendMut<SocketWidget>,
) {
    if removed.read().count() == 0 || !remaining.is_empty() {
        return;
    }

    log::info!("Status view removed, unsubscribing");
    widget.unmount();
}
