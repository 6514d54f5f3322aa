// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for Home Assistant state events.

use crate::client::messages::{StatesSnapshot, UpstreamEvent};
use crate::controller::Controller;
use actix::Handler;
use log::debug;

impl Handler<UpstreamEvent> for Controller {
    type Result = ();

    fn handle(&mut self, msg: UpstreamEvent, _ctx: &mut Self::Context) -> Self::Result {
        let changes = self
            .persons
            .apply_update(&msg.entity_id, msg.state, msg.attributes);
        for change in &changes {
            self.broadcast_entity_change(change);
        }
    }
}

impl Handler<StatesSnapshot> for Controller {
    type Result = ();

    fn handle(&mut self, msg: StatesSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        debug!(
            "[{}] got states snapshot with {} entities",
            msg.client_id,
            msg.states.len()
        );
        let changes = self.persons.apply_snapshot(msg.states);
        for change in &changes {
            self.broadcast_entity_change(change);
        }
    }
}
