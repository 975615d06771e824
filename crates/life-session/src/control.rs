//! Control commands and the notifications delivered to long-poll listeners.

use serde::{Deserialize, Serialize};

/// A viewer-issued control command.
///
/// The wire names are `camelCase`. The legacy button titles (`stopLife`,
/// `startLife`, `clearSession`) are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlCommand {
    /// Double the inter-generation delay.
    DelayMore,
    /// Halve the inter-generation delay.
    DelayLess,
    /// Stop advancing.
    #[serde(alias = "stopLife")]
    Pause,
    /// Resume advancing.
    #[serde(alias = "startLife")]
    Resume,
    /// Destroy the session.
    #[serde(alias = "clearSession")]
    Clear,
}

/// Session control state as broadcast to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    /// Current inter-generation target interval in milliseconds.
    pub delay_ms: f64,
    /// Whether the session is paused.
    pub paused: bool,
}

/// What a listener slot resolves to. Exactly one is delivered per slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Control state changed.
    Control(ControlEvent),
    /// A new view opened on the session; re-fetch everything.
    Refresh,
    /// The session was cleared.
    Closed,
    /// Another registration for the same page replaced this one.
    Superseded,
    /// The slot was removed without an event.
    Removed,
}

/// Result of applying a control command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlOutcome {
    /// The command that was applied.
    pub command: ControlCommand,
    /// Control state after the command.
    pub event: ControlEvent,
    /// Listener slots fulfilled by this command.
    pub notified: usize,
    /// Whether the command closed the session.
    pub closed: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_wire_names_and_aliases() {
        let parse = |s: &str| serde_json::from_str::<ControlCommand>(&format!("\"{s}\"")).unwrap();
        assert_eq!(parse("delayMore"), ControlCommand::DelayMore);
        assert_eq!(parse("delayLess"), ControlCommand::DelayLess);
        assert_eq!(parse("pause"), ControlCommand::Pause);
        assert_eq!(parse("stopLife"), ControlCommand::Pause);
        assert_eq!(parse("startLife"), ControlCommand::Resume);
        assert_eq!(parse("clearSession"), ControlCommand::Clear);
    }

    #[test]
    fn notifications_are_tagged() {
        let control = Notification::Control(ControlEvent {
            delay_ms: 400.0,
            paused: true,
        });
        assert_eq!(
            serde_json::to_value(control).unwrap(),
            serde_json::json!({ "kind": "control", "delay_ms": 400.0, "paused": true })
        );
        assert_eq!(
            serde_json::to_value(Notification::Refresh).unwrap(),
            serde_json::json!({ "kind": "refresh" })
        );
    }
}
