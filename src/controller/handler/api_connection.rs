// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for integration client connection messages.

use crate::controller::{ApiSession, ApiSessionDisconnect, Controller, NewApiSession};
use actix::{Context, Handler};

impl Handler<NewApiSession> for Controller {
    type Result = ();

    fn handle(&mut self, msg: NewApiSession, _: &mut Context<Self>) -> Self::Result {
        self.sessions
            .insert(msg.id.clone(), ApiSession::new(msg.addr));

        self.send_device_state(&msg.id);
    }
}

impl Handler<ApiSessionDisconnect> for Controller {
    type Result = ();

    fn handle(&mut self, msg: ApiSessionDisconnect, _: &mut Context<Self>) {
        self.sessions.remove(&msg.id);
    }
}
