// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix actor message definitions used to communicate with the [`Controller`].
//!
//! These are the Actix messages used for the integration API WebSocket server connections
//! and the Home Assistant client connections to interact with the Controller.

#[allow(unused_imports)] // used for doc links
use crate::controller::Controller;
use crate::errors::ServiceError;
use crate::server::WsMessage;
use crate::util::DeserializeMsgData;
use actix::prelude::{Message, Recipient};
use serde::Deserialize;
use strum::{Display, EnumMessage, EnumString};

/// Send a WebSocket message to an integration client.
///
/// The [`WsMessage`] is either an integration API response or event message.
/// Sending is best-effort only!
#[derive(Message)]
#[rtype(result = "()")]
pub struct SendWsMessage(pub WsMessage);

/// New WebSocket connection from an integration client established.
///
/// Event to notify the [`Controller`] that a new WS integration client connected.
#[derive(Message)]
#[rtype(result = "()")]
pub struct NewApiSession {
    /// Actor address of the WS session to send messages to
    pub addr: Recipient<SendWsMessage>,
    /// unique identifier of WS connection
    pub id: String,
}

/// Integration client WebSocket connection disconnected.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ApiSessionDisconnect {
    /// unique identifier of WS connection
    pub id: String,
}

/// Actor message for an integration API request.
///
/// The controller either returns a direct response message, or `None` if the response or a
/// follow-up event is sent asynchronously at a later time.
///
/// - a returned [ServiceError] is mapped to an error response message for the client.
#[derive(Debug, Message)]
#[rtype(result = "Result<Option<WsMessage>, ServiceError>")]
pub struct ApiRequestMsg {
    pub ws_id: String,
    pub req_id: u32,
    pub request: WsRequest,
    pub msg_data: Option<serde_json::Value>,
}

/// Convert the full request message to only the message data payload.
///
/// Required for [`DeserializeMsgData`] trait.
#[allow(clippy::from_over_into)] // we only need into
impl Into<Option<serde_json::Value>> for ApiRequestMsg {
    fn into(self) -> Option<serde_json::Value> {
        self.msg_data
    }
}

impl DeserializeMsgData for ApiRequestMsg {}

/// Actor message for an integration API event.
#[derive(Debug, Message)]
#[rtype(result = "()")]
#[allow(dead_code)] // msg_data not used
pub struct ApiEventMsg {
    pub ws_id: String,
    pub event: WsEvent,
    pub msg_data: Option<serde_json::Value>,
}

/// Integration client initiated request messages.
/// The corresponding response message name is set with the strum message macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Display, EnumMessage, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WsRequest {
    #[strum(message = "driver_version")]
    GetDriverVersion,
    #[strum(message = "driver_metadata")]
    GetDriverMetadata,
    #[strum(message = "device_state")]
    GetDeviceState,
    #[strum(message = "available_entities")]
    GetAvailableEntities,
    #[strum(message = "entity_states")]
    GetEntityStates,
    #[strum(message = "result")]
    SubscribeEvents,
    #[strum(message = "result")]
    UnsubscribeEvents,
    #[strum(message = "result")]
    EntityCommand,
    #[strum(message = "result")]
    SetupDriver,
    #[strum(message = "result")]
    SetDriverUserData,
}

/// Integration client initiated event messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WsEvent {
    Connect,
    Disconnect,
    EnterStandby,
    ExitStandby,
    AbortDriverSetup,
}
