// src/parser.rs

pub const STATUS_LABEL: &str = "Status:";
pub const SERVER_LABEL: &str = "Current server:";
pub const HOSTNAME_LABEL: &str = "Hostname:";
pub const KILL_SWITCH_LABEL: &str = "Kill Switch:";
pub const MESHNET_LABEL: &str = "Meshnet:";

const CONNECTED: &str = "Connected";
const DISCONNECTED: &str = "Disconnected";
const ENABLED: &str = "enabled";
const DISABLED: &str = "disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Connected,
    Disconnected,
}

/// Returns the rest of the first line starting with `label`, trimmed.
pub fn extract_field(text: &str, label: &str) -> Option<String> {
    text.lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn parse_connection(text: &str) -> Option<Connection> {
    match extract_field(text, STATUS_LABEL)?.as_str() {
        CONNECTED => Some(Connection::Connected),
        DISCONNECTED => Some(Connection::Disconnected),
        _ => None,
    }
}

/// Older CLI releases print `Current server:`, newer ones `Hostname:`.
pub fn parse_server(text: &str) -> Option<String> {
    extract_field(text, SERVER_LABEL).or_else(|| extract_field(text, HOSTNAME_LABEL))
}

pub fn parse_kill_switch(text: &str) -> Option<bool> {
    parse_toggle(text, KILL_SWITCH_LABEL)
}

pub fn parse_meshnet(text: &str) -> Option<bool> {
    parse_toggle(text, MESHNET_LABEL)
}

fn parse_toggle(text: &str, label: &str) -> Option<bool> {
    match extract_field(text, label)?.as_str() {
        ENABLED => Some(true),
        DISABLED => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTED_STATUS: &str = "Status: Connected\n\
        Current server: us1234.server.com\n\
        Country: United States\n\
        City: New York\n\
        Current technology: NORDLYNX\n\
        Uptime: 3 minutes 12 seconds\n";

    const SETTINGS: &str = "Technology: NORDLYNX\n\
        Firewall: enabled\n\
        Kill Switch: enabled\n\
        Threat Protection Lite: disabled\n\
        Notify: disabled\n\
        Auto-connect: disabled\n\
        Meshnet: disabled\n\
        DNS: disabled\n";

    #[test]
    fn connected_status_yields_server() {
        let text = "Status: Connected\nCurrent server: us1234.server.com\n";
        assert_eq!(parse_connection(text), Some(Connection::Connected));
        assert_eq!(parse_server(text).as_deref(), Some("us1234.server.com"));
    }

    #[test]
    fn disconnected_status() {
        assert_eq!(
            parse_connection("Status: Disconnected\n"),
            Some(Connection::Disconnected)
        );
    }

    #[test]
    fn tolerates_extra_fields_and_reordering() {
        let reordered = "Uptime: 1 hour\nCurrent server: de512.nordvpn.com\n  Status: Connected\n";
        assert_eq!(parse_connection(reordered), Some(Connection::Connected));
        assert_eq!(
            parse_server(reordered).as_deref(),
            Some("de512.nordvpn.com")
        );
        assert_eq!(
            parse_server(CONNECTED_STATUS).as_deref(),
            Some("us1234.server.com")
        );
    }

    #[test]
    fn falls_back_to_hostname_label() {
        let text = "Status: Connected\nHostname: nl901.nordvpn.com\nIP: 10.0.0.1\n";
        assert_eq!(parse_server(text).as_deref(), Some("nl901.nordvpn.com"));
    }

    #[test]
    fn unknown_connection_values_are_unrecognized() {
        assert_eq!(parse_connection("Status: Connecting\n"), None);
        assert_eq!(parse_connection("Status:\n"), None);
        assert_eq!(parse_connection("You are not logged in.\n"), None);
        assert_eq!(parse_connection(""), None);
    }

    #[test]
    fn settings_toggles() {
        assert_eq!(parse_kill_switch(SETTINGS), Some(true));
        assert_eq!(parse_meshnet(SETTINGS), Some(false));
    }

    #[test]
    fn toggle_values_must_be_exact() {
        assert_eq!(parse_kill_switch("Kill Switch: Enabled\n"), None);
        assert_eq!(parse_kill_switch("Kill Switch: on\n"), None);
        assert_eq!(parse_meshnet("Firewall: enabled\n"), None);
    }

    #[test]
    fn extract_field_reports_absence() {
        assert_eq!(extract_field("Country: Germany\n", STATUS_LABEL), None);
        assert_eq!(
            extract_field("Country: Germany  \n", "Country:").as_deref(),
            Some("Germany")
        );
    }
}
