// src/menu.rs

use crate::status::{ConnectionSnapshot, Status};

pub const APP_TITLE: &str = "NordTray";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub icon_active: bool,
    pub show_connect: bool,
    pub show_disconnect: bool,
    pub kill_switch_checked: bool,
    pub kill_switch_enabled: bool,
    pub meshnet_checked: bool,
    pub meshnet_enabled: bool,
    pub tooltip: String,
}

impl MenuState {
    pub fn from_snapshot(status: Status, snapshot: &ConnectionSnapshot) -> Self {
        let done = status == Status::Done;
        let (show_connect, show_disconnect) = match status {
            Status::Done => (!snapshot.connected, snapshot.connected),
            // We cannot tell which one applies, so offer both.
            Status::Stalled => (true, true),
            Status::Failed | Status::NoNetwork => (true, false),
        };

        let tooltip = match (&snapshot.server_name, done && snapshot.connected) {
            (Some(server), true) => server.clone(),
            (None, true) => "Connected".to_string(),
            _ => APP_TITLE.to_string(),
        };

        Self {
            icon_active: done && snapshot.connected,
            show_connect,
            show_disconnect,
            kill_switch_checked: snapshot.kill_switch,
            kill_switch_enabled: done,
            meshnet_checked: snapshot.meshnet,
            meshnet_enabled: done || snapshot.meshnet,
            tooltip,
        }
    }

    /// Icon to draw right now; alternates while an action is in flight.
    pub fn icon_frame(&self, busy: bool, blink_on: bool) -> bool {
        if busy { blink_on } else { self.icon_active }
    }
}
