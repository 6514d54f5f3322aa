// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

use crate::client::messages::SubscribedEntities;
use crate::client::HomeAssistantClient;
use actix::Handler;
use log::debug;

impl Handler<SubscribedEntities> for HomeAssistantClient {
    type Result = ();

    /// Called by the controller when the configured persons change.
    ///
    /// The state_changed subscription covers all entities; this set is the local filter
    /// applied to events and get_states results.
    fn handle(&mut self, msg: SubscribedEntities, _ctx: &mut Self::Context) {
        debug!(
            "[{}] Updated watched entities: {:?}",
            self.id, msg.entity_ids
        );
        self.watched_entities = msg.entity_ids;
    }
}
