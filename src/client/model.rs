// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! HA WebSocket data structure definitions for JSON serialization & deserialization.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub(crate) struct Event {
    //pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventData {
    pub entity_id: String,
    /// `null` when the entity was removed.
    pub new_state: Option<EventState>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventState {
    pub state: String,
    pub attributes: Option<Map<String, Value>>,
}

/// One row of a `get_states` result.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamEntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// One row of a `config/entity_registry/list` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub entity_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
}
