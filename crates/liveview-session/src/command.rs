use serde::{Deserialize, Serialize};
use serde_json::json;

/// Channel the device listens on for control commands.
pub const COMMAND_CHANNEL: &str = "camera_control";

/// Actions a camera understands. Wire names are fixed by the device
/// firmware; note the pan/tilt pair does not follow snake_case of the
/// variant name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    PowerOn,
    GotoPreset,
    SyncUi,
    Zoom,
    #[serde(rename = "pantilt_absolute")]
    PanTiltAbsolute,
    #[serde(rename = "pantilt_continuous")]
    PanTiltContinuous,
    Stop,
    CreatePreset,
    DeletePreset,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CommandValue {
    Int(i64),
    Float(f64),
    Text(String),
    PanTilt { pan: f64, tilt: f64 },
}

impl From<i64> for CommandValue {
    fn from(v: i64) -> Self {
        CommandValue::Int(v)
    }
}

impl From<f64> for CommandValue {
    fn from(v: f64) -> Self {
        CommandValue::Float(v)
    }
}

impl From<&str> for CommandValue {
    fn from(v: &str) -> Self {
        CommandValue::Text(v.to_string())
    }
}

impl From<String> for CommandValue {
    fn from(v: String) -> Self {
        CommandValue::Text(v)
    }
}

/// One outbound control message. Ephemeral: constructed, sent, never
/// stored. The task id lets the receiving side deduplicate and trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlCommand {
    pub action: ControlAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<CommandValue>,
    pub task_id: String,
}

impl ControlCommand {
    pub fn new(action: ControlAction, value: Option<CommandValue>, task_id: String) -> Self {
        Self {
            action,
            value,
            task_id,
        }
    }

    /// Channel envelope: the command keyed by the camera name, so one
    /// channel can address several cameras behind an agent.
    pub fn envelope(&self, device_name: &str) -> serde_json::Value {
        json!({ device_name: self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_serialize_to_wire_names() -> anyhow::Result<()> {
        let cases = [
            (ControlAction::PowerOn, "power_on"),
            (ControlAction::GotoPreset, "goto_preset"),
            (ControlAction::SyncUi, "sync_ui"),
            (ControlAction::Zoom, "zoom"),
            (ControlAction::PanTiltAbsolute, "pantilt_absolute"),
            (ControlAction::PanTiltContinuous, "pantilt_continuous"),
            (ControlAction::Stop, "stop"),
            (ControlAction::CreatePreset, "create_preset"),
            (ControlAction::DeletePreset, "delete_preset"),
            (ControlAction::Reset, "reset"),
        ];
        for (action, wire) in cases {
            assert_eq!(serde_json::to_value(action)?, json!(wire));
        }
        Ok(())
    }

    #[test]
    fn envelope_keys_command_by_camera_name() -> anyhow::Result<()> {
        let command = ControlCommand::new(
            ControlAction::GotoPreset,
            Some("Gate".into()),
            "task-1".to_string(),
        );
        let envelope = command.envelope("cam1");
        assert_eq!(
            envelope,
            json!({
                "cam1": {
                    "action": "goto_preset",
                    "value": "Gate",
                    "task_id": "task-1",
                }
            })
        );
        Ok(())
    }

    #[test]
    fn valueless_commands_omit_the_value_field() -> anyhow::Result<()> {
        let command = ControlCommand::new(ControlAction::Stop, None, "task-2".to_string());
        let body = serde_json::to_value(&command)?;
        assert!(body.get("value").is_none());
        Ok(())
    }

    #[test]
    fn pan_tilt_values_serialize_as_payload_objects() -> anyhow::Result<()> {
        let value = CommandValue::PanTilt {
            pan: -0.4,
            tilt: 0.8,
        };
        assert_eq!(serde_json::to_value(&value)?, json!({"pan": -0.4, "tilt": 0.8}));
        Ok(())
    }
}
