// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Handle response messages from integration clients.

use crate::server::ws::{api_messages, WsConn};

use actix_web_actors::ws::WebsocketContext;
use log::warn;

impl WsConn {
    /// Handle response messages from an integration client.
    ///
    /// The driver doesn't send requests to its clients, any response is unexpected.
    pub(crate) fn on_response(
        &mut self,
        response: api_messages::WsMessage,
        _ctx: &mut WebsocketContext<WsConn>,
    ) {
        warn!(
            "[{}] Unexpected response: {}",
            self.id,
            response.msg.as_deref().unwrap_or("?")
        );
    }
}
