// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix actor handler implementation for the `GetEntityRegistry` message

use actix::Handler;
use log::debug;
use serde_json::{json, Value};

use crate::client::messages::{EntityRegistry, GetEntityRegistry};
use crate::client::model::RegistryEntry;
use crate::client::HomeAssistantClient;
use crate::errors::ServiceError;

impl Handler<GetEntityRegistry> for HomeAssistantClient {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, _: GetEntityRegistry, ctx: &mut Self::Context) -> Self::Result {
        debug!("[{}] GetEntityRegistry", self.id);

        let id = self.new_msg_id();
        self.entity_registry_id = Some(id);
        self.send_json(json!({"id": id, "type": "config/entity_registry/list"}), ctx)
    }
}

impl HomeAssistantClient {
    pub(crate) fn handle_entity_registry_result(
        &mut self,
        entries: Vec<Value>,
    ) -> Result<(), ServiceError> {
        let entries: Vec<RegistryEntry> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<RegistryEntry>(entry).ok())
            .collect();

        debug!("[{}] got {} entity registry entries", self.id, entries.len());

        self.controller_actor.try_send(EntityRegistry {
            client_id: self.id.clone(),
            entries,
        })?;

        Ok(())
    }
}
