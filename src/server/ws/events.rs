// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Handle events from integration clients.

use crate::controller::{ApiEventMsg, WsEvent};
use crate::server::ws::{api_messages, WsConn};

use actix_web_actors::ws::WebsocketContext;
use log::{error, warn};
use std::str::FromStr;

impl WsConn {
    /// Handle event messages from an integration client.
    pub(crate) fn on_event(
        &mut self,
        event: api_messages::WsMessage,
        _ctx: &mut WebsocketContext<WsConn>,
    ) {
        let msg = match event.msg {
            None => {
                warn!("[{}] Missing property: msg", self.id);
                return;
            }
            Some(ref m) => m.as_str(),
        };

        if let Ok(event_msg) = WsEvent::from_str(msg) {
            if let Err(e) = self.controller_addr.try_send(ApiEventMsg {
                ws_id: self.id.clone(),
                event: event_msg,
                msg_data: event.msg_data,
            }) {
                error!("[{}] Controller mailbox error: {e}", self.id);
            }
        } else {
            warn!("[{}] Unknown event: {msg}", self.id);
        }
    }
}
