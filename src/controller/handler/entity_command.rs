// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for [EntityCommandMsg].
//!
//! The only command entity of this integration is the person-type text entity. Setting its
//! value updates the person's category and persists the configuration, mirroring how the
//! category can be entered in the setup wizard.

use crate::controller::handler::EntityCommandMsg;
use crate::controller::Controller;
use crate::errors::ServiceError;
use crate::server::{WsMessage, WsResultMsgData};
use actix::Handler;
use log::debug;

impl Handler<EntityCommandMsg> for Controller {
    type Result = Result<Option<WsMessage>, ServiceError>;

    fn handle(&mut self, msg: EntityCommandMsg, _ctx: &mut Self::Context) -> Self::Result {
        let command = msg.command;
        debug!(
            "[{}] entity command {} for {}",
            msg.ws_id, command.cmd_id, command.entity_id
        );

        let cmd = command
            .cmd_id
            .strip_prefix("text.")
            .unwrap_or(&command.cmd_id);
        if cmd != "set_value" {
            return Err(ServiceError::BadRequest(format!(
                "Unsupported command: {}",
                command.cmd_id
            )));
        }

        let value = command
            .params
            .as_ref()
            .and_then(|p| p.get("value"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::BadRequest("Missing parameter: value".into()))?;

        let change = self
            .persons
            .set_category(&command.entity_id, value)
            .ok_or_else(|| ServiceError::NotFound(command.entity_id.clone()))?;

        self.persist_configuration();
        self.broadcast_entity_change(&change);

        Ok(Some(WsMessage::response(
            msg.req_id,
            "result",
            WsResultMsgData::ok("Command executed"),
        )))
    }
}
