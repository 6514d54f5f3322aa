// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix actor handler implementation for the `GetStates` message

use actix::Handler;
use log::debug;
use serde_json::{json, Value};

use crate::client::messages::{GetStates, StatesSnapshot};
use crate::client::model::UpstreamEntityState;
use crate::client::HomeAssistantClient;
use crate::errors::ServiceError;

impl Handler<GetStates> for HomeAssistantClient {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, _: GetStates, ctx: &mut Self::Context) -> Self::Result {
        debug!("[{}] GetStates", self.id);

        let id = self.new_msg_id();
        self.entity_states_id = Some(id);
        self.send_json(json!({"id": id, "type": "get_states"}), ctx)
    }
}

impl HomeAssistantClient {
    /// Reduce the full state dump to the watched upstream entities and hand the snapshot to
    /// the controller.
    pub(crate) fn handle_get_states_result(
        &mut self,
        entities: Vec<Value>,
    ) -> Result<(), ServiceError> {
        let states: Vec<UpstreamEntityState> = entities
            .into_iter()
            .filter_map(|entity| serde_json::from_value::<UpstreamEntityState>(entity).ok())
            .filter(|state| self.watched_entities.contains(&state.entity_id))
            .collect();

        debug!(
            "[{}] got {} watched entity state(s) from get_states",
            self.id,
            states.len()
        );

        self.controller_actor.try_send(StatesSnapshot {
            client_id: self.id.clone(),
            states,
        })?;

        Ok(())
    }
}
