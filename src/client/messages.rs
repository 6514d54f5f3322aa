// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix Actor message definitions for HomeAssistantClient

use std::collections::HashSet;

use actix::prelude::Message;
use awc::ws::CloseCode;
use serde_json::{Map, Value};

use crate::client::model::{RegistryEntry, UpstreamEntityState};
use crate::errors::ServiceError;

/// Fetch all states from Home Assistant.
///
/// The asynchronous result is sent to the controller as [StatesSnapshot].
#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct GetStates;

/// Fetch the entity registry from Home Assistant.
///
/// Used by the setup wizard for Wi-Fi sensor detection. The asynchronous result is sent to
/// the controller as [EntityRegistry].
#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct GetEntityRegistry;

/// Sent by controller when the configured persons and therefore the watched upstream
/// entities change.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SubscribedEntities {
    pub entity_ids: HashSet<String>,
}

/// HA client connection states
pub enum ConnectionState {
    AuthenticationFailed,
    Connected,
    Closed,
}

/// HA client connection events
#[derive(Message)]
#[rtype(result = "()")]
pub struct ConnectionEvent {
    pub client_id: String,
    pub state: ConnectionState,
}

/// State change of a watched upstream entity.
#[derive(Message)]
#[rtype(result = "()")]
#[allow(dead_code)] // client_id not used
pub struct UpstreamEvent {
    pub client_id: String,
    pub entity_id: String,
    pub state: String,
    pub attributes: Map<String, Value>,
}

/// Asynchronous HA response from [GetStates].
#[derive(Message)]
#[rtype(result = "()")]
#[allow(dead_code)] // client_id not used
pub struct StatesSnapshot {
    pub client_id: String,
    pub states: Vec<UpstreamEntityState>,
}

/// Asynchronous HA response from [GetEntityRegistry].
#[derive(Message)]
#[rtype(result = "()")]
#[allow(dead_code)] // client_id not used
pub struct EntityRegistry {
    pub client_id: String,
    pub entries: Vec<RegistryEntry>,
}

/// HA client request: disconnect and close the session.
// Used internally by the client and from Controller
#[derive(Message)]
#[rtype(result = "()")]
pub struct Close {
    /// WebSocket close code
    pub code: CloseCode,
    pub description: Option<String>,
}

impl Default for Close {
    fn default() -> Self {
        Self {
            code: CloseCode::Normal,
            description: None,
        }
    }
}

impl Close {
    pub fn invalid() -> Self {
        Self {
            code: CloseCode::Invalid,
            description: None,
        }
    }
    pub fn unsupported() -> Self {
        Self {
            code: CloseCode::Unsupported,
            description: None,
        }
    }
}
