// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handlers.

mod api_connection;
mod api_event;
mod api_request;
mod entity_command;
mod ha_connection;
mod ha_event;
mod setup;

pub(crate) use setup::SetupSession;

use crate::errors::ServiceError;
use crate::server::{EntityCommand, IntegrationSetup, SetupDriver, WsMessage};
use actix::Message;

/// Internal message to connect to Home Assistant.
#[derive(Message, Default)]
#[rtype(result = "Result<(), std::io::Error>")]
struct ConnectMsg {}

/// Internal message to disconnect from Home Assistant.
#[derive(Message)]
#[rtype(result = "()")]
struct DisconnectMsg {}

/// Internal message to start the driver setup flow.
#[derive(Message)]
#[rtype(result = "Result<Option<WsMessage>, ServiceError>")]
struct SetupDriverMsg {
    pub ws_id: String,
    pub req_id: u32,
    pub data: SetupDriver,
}

/// Internal message to set driver setup input data.
#[derive(Message)]
#[rtype(result = "Result<Option<WsMessage>, ServiceError>")]
struct SetDriverUserDataMsg {
    pub ws_id: String,
    pub req_id: u32,
    pub data: IntegrationSetup,
}

/// Internal message for an `entity_command` request.
#[derive(Message)]
#[rtype(result = "Result<Option<WsMessage>, ServiceError>")]
struct EntityCommandMsg {
    pub ws_id: String,
    pub req_id: u32,
    pub command: EntityCommand,
}

/// Internal message to abort setup flow due to a timeout or an abort message from a client.
#[derive(Message)]
#[rtype(result = "()")]
pub(crate) struct AbortDriverSetup {
    pub ws_id: String,
    /// internal timeout
    pub timeout: bool,
}
