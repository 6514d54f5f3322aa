// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for [ApiEventMsg].

use crate::controller::handler::{AbortDriverSetup, ConnectMsg, DisconnectMsg};
use crate::controller::{ApiEventMsg, Controller, WsEvent};
use crate::server::DeviceState;
use actix::{AsyncContext, Handler};
use log::error;

impl Handler<ApiEventMsg> for Controller {
    type Result = ();

    fn handle(&mut self, msg: ApiEventMsg, ctx: &mut Self::Context) -> Self::Result {
        if !self.sessions.contains_key(&msg.ws_id) {
            error!("Session not found: {}", msg.ws_id);
            return;
        }

        match msg.event {
            WsEvent::Connect => {
                if self.device_state != DeviceState::Connected {
                    self.set_device_state(DeviceState::Connecting);
                    ctx.notify(ConnectMsg::default());
                }
                // make sure the client has the correct state, it might be out of sync
                self.send_device_state(&msg.ws_id);
            }
            WsEvent::Disconnect => {
                ctx.notify(DisconnectMsg {});
                // this prevents automatic reconnects
                self.set_device_state(DeviceState::Disconnected);
            }
            WsEvent::EnterStandby => {
                if let Some(session) = self.sessions.get_mut(&msg.ws_id) {
                    session.standby = true;
                }
                if self.settings.hass.disconnect_in_standby
                    && self.sessions.values().all(|s| s.standby)
                {
                    ctx.notify(DisconnectMsg {});
                }
            }
            WsEvent::ExitStandby => {
                if let Some(session) = self.sessions.get_mut(&msg.ws_id) {
                    session.standby = false;
                }
                if self.settings.hass.disconnect_in_standby {
                    ctx.notify(ConnectMsg::default());
                }
                self.send_device_state(&msg.ws_id);
            }
            WsEvent::AbortDriverSetup => {
                ctx.notify(AbortDriverSetup {
                    ws_id: msg.ws_id,
                    timeout: false,
                });
            }
        }
    }
}
