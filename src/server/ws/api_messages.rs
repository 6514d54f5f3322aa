// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Integration API message definitions for JSON serialization & deserialization.

use std::collections::HashMap;
use std::time::SystemTime;

use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_with::skip_serializing_none;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Version of the integration API served on `/ws`.
pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    Device,
    Entity,
}

/// Generic message definition for requests, responses and events.
#[skip_serializing_none]
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WsMessage {
    pub kind: Option<String>,
    pub id: Option<u32>,
    pub req_id: Option<u32>,
    pub msg: Option<String>,
    pub code: Option<u16>,
    pub cat: Option<EventCategory>,
    pub ts: Option<String>,
    pub msg_data: Option<Value>,
}

fn to_rfc3339<T>(dt: T) -> Option<String>
where
    T: Into<OffsetDateTime>,
{
    dt.into().format(&Rfc3339).ok()
}

impl WsMessage {
    pub fn event(msg: &str, cat: EventCategory, msg_data: Value) -> Self {
        Self {
            kind: Some("event".into()),
            msg: Some(msg.into()),
            cat: Some(cat),
            ts: to_rfc3339(SystemTime::now()),
            msg_data: Some(msg_data),
            ..Default::default()
        }
    }

    pub fn response<T: Serialize>(req_id: u32, msg: &str, msg_data: T) -> Self {
        match serde_json::to_value(msg_data) {
            Ok(v) => Self {
                kind: Some("resp".into()),
                req_id: Some(req_id),
                msg: Some(msg.into()),
                code: Some(200),
                msg_data: Some(v),
                ..Default::default()
            },
            Err(e) => {
                error!("Error serializing struct: {e:?}");
                Self {
                    kind: Some("resp".into()),
                    req_id: Some(req_id),
                    msg: Some("result".into()),
                    code: Some(500),
                    msg_data: Some(
                        json!({ "code": "INTERNAL_ERROR", "message": "Error serializing result"}),
                    ),
                    ..Default::default()
                }
            }
        }
    }

    pub fn error(req_id: u32, code: u16, msg_data: WsError) -> Self {
        Self {
            kind: Some("resp".into()),
            req_id: Some(req_id),
            msg: Some("result".into()),
            code: Some(code),
            msg_data: serde_json::to_value(msg_data).ok(),
            ..Default::default()
        }
    }

    pub fn missing_field(req_id: u32, field: &str) -> Self {
        Self::error(
            req_id,
            400,
            WsError {
                code: "BAD_REQUEST".into(),
                message: format!("Missing field: {field}"),
            },
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WsError {
    pub code: String,
    pub message: String,
}

/// Common `result` response payload.
#[derive(Debug, Clone, Serialize, derive_more::Constructor)]
pub struct WsResultMsgData {
    pub code: String,
    pub message: String,
}

impl WsResultMsgData {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: "OK".into(),
            message: message.into(),
        }
    }
}

/// Home Assistant connection state of the driver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Sensor,
    DeviceTracker,
    Text,
}

/// State update of a derived entity, pushed as `entity_change` event and returned from
/// `entity_states`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub attributes: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailableEntity {
    pub entity_id: String,
    pub device_id: Option<String>,
    pub entity_type: EntityType,
    pub device_class: Option<String>,
    /// Language code mapped to display name, `en` is always present.
    pub name: HashMap<String, String>,
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct AvailableEntitiesMsgData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub available_entities: Vec<AvailableEntity>,
}

#[derive(Debug, Serialize)]
pub struct IntegrationVersion {
    pub api: String,
    pub integration: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeEvents {
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

/// `setup_driver` request payload starting the setup wizard.
#[derive(Debug, Deserialize)]
pub struct SetupDriver {
    #[serde(default)]
    pub setup_data: HashMap<String, String>,
    #[serde(default)]
    pub reconfigure: Option<bool>,
}

/// `set_driver_user_data` request payload: response to a required user action.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationSetup {
    InputValues(HashMap<String, String>),
    Confirm(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationSetupState {
    Setup,
    WaitUserAction,
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupChangeEventType {
    Start,
    Setup,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationSetupError {
    NotFound,
    ConnectionRefused,
    AuthorizationError,
    Timeout,
    Other,
}

/// `driver_setup_change` event payload.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct DriverSetupChange {
    pub event_type: SetupChangeEventType,
    pub state: IntegrationSetupState,
    pub error: Option<IntegrationSetupError>,
    pub require_user_action: Option<Value>,
}

/// `entity_command` request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityCommand {
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    pub entity_id: String,
    pub cmd_id: String,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

/// Driver metadata, loaded from the compiled-in `driver.json` resource.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IntegrationDriverInfo {
    pub driver_id: Option<String>,
    pub name: Option<HashMap<String, String>>,
    pub description: Option<HashMap<String, String>>,
    pub version: Option<String>,
    pub developer: Option<DriverDeveloper>,
    pub pwd_protected: Option<bool>,
    pub token: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DriverDeveloper {
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_message_carries_kind_category_and_timestamp() {
        let msg = WsMessage::event("device_state", EventCategory::Device, json!({"state": "CONNECTED"}));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!("event", value["kind"]);
        assert_eq!("DEVICE", value["cat"]);
        assert_eq!("device_state", value["msg"]);
        assert!(value["ts"].is_string());
        assert!(value.get("req_id").is_none());
    }

    #[test]
    fn response_message_has_code_200() {
        let msg = WsMessage::response(7, "driver_version", json!({"api": "1.0.0"}));
        assert_eq!(Some(7), msg.req_id);
        assert_eq!(Some(200), msg.code);
        assert_eq!(Some("resp".into()), msg.kind);
    }

    #[test]
    fn entity_type_uses_snake_case_on_the_wire() {
        assert_eq!(
            "\"device_tracker\"",
            serde_json::to_string(&EntityType::DeviceTracker).unwrap()
        );
    }

    #[test]
    fn integration_setup_deserializes_input_values() {
        let setup: IntegrationSetup =
            serde_json::from_value(json!({"input_values": {"category": "Family"}})).unwrap();
        match setup {
            IntegrationSetup::InputValues(values) => {
                assert_eq!(Some(&"Family".to_string()), values.get("category"))
            }
            _ => panic!("expected input_values"),
        }
    }

    #[test]
    fn device_state_serializes_screaming_snake_case() {
        assert_eq!(
            "\"CONNECTED\"",
            serde_json::to_string(&DeviceState::Connected).unwrap()
        );
        assert_eq!("CONNECTED", DeviceState::Connected.to_string());
    }
}
