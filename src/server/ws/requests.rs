// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Handle request messages from integration clients.

use crate::controller::{ApiRequestMsg, WsRequest};
use crate::errors::ServiceError;
use crate::server::ws::{api_messages, WsConn};

use actix::{ActorFutureExt, ContextFutureSpawner, WrapFuture};
use actix_web_actors::ws::WebsocketContext;
use log::{error, warn};
use std::str::FromStr;

impl WsConn {
    /// Handle request messages from an integration client.
    ///
    /// The request is delegated to the controller actor. A `Some` result is sent back as
    /// response message, errors are mapped to an error response.
    pub(crate) fn on_request(
        &mut self,
        request: api_messages::WsMessage,
        ctx: &mut WebsocketContext<WsConn>,
    ) {
        let id = match request.id {
            None => {
                self.send_missing_field_error(0, "id", ctx);
                return;
            }
            Some(id) => id,
        };
        let msg = match request.msg {
            None => {
                self.send_missing_field_error(id, "msg", ctx);
                return;
            }
            Some(ref m) => m.as_str(),
        };

        let req_msg = match WsRequest::from_str(msg) {
            Ok(m) => m,
            Err(_) => {
                warn!("[{}] Unknown message: {msg}", self.id);
                self.send_error(id, 400, "BAD_REQUEST", format!("Unknown message: {msg}"), ctx);
                return;
            }
        };

        let controller = self.controller_addr.clone();
        let ws_id = self.id.clone();
        async move {
            controller
                .send(ApiRequestMsg {
                    ws_id,
                    req_id: id,
                    request: req_msg,
                    msg_data: request.msg_data,
                })
                .await
        }
        .into_actor(self)
        .map(move |result, act, ctx| match result {
            Ok(Ok(Some(response))) => {
                if let Ok(msg) = serde_json::to_string(&response) {
                    ctx.text(msg);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => act.send_service_error(id, &e, ctx),
            Err(e) => {
                error!("[{}] Controller mailbox error: {e}", act.id);
                act.send_error(id, 500, "INTERNAL_ERROR", "Error processing request".into(), ctx);
            }
        })
        .spawn(ctx);
    }

    /// Map a [ServiceError] to an integration API error response.
    pub(crate) fn send_service_error(
        &self,
        req_id: u32,
        error: &ServiceError,
        ctx: &mut WebsocketContext<WsConn>,
    ) {
        let (code, error_code) = match error {
            ServiceError::BadRequest(_) => (400, "BAD_REQUEST"),
            ServiceError::NotFound(_) => (404, "NOT_FOUND"),
            ServiceError::NotConnected | ServiceError::ServiceUnavailable(_) => {
                (503, "SERVICE_UNAVAILABLE")
            }
            ServiceError::InternalServerError(_) | ServiceError::SerializationError(_) => {
                (500, "INTERNAL_ERROR")
            }
        };
        self.send_error(req_id, code, error_code, error.to_string(), ctx);
    }
}
