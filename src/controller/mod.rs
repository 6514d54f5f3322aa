// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Central controller handling integration API requests and the HA client connection.

mod handler;
mod messages;

pub use messages::*;

use crate::client::HomeAssistantClient;
use crate::configuration::{save_user_settings, setup_timeout, Settings};
use crate::persons::PersonRegistry;
use crate::server::{
    DeviceState, EntityChange, EventCategory, IntegrationDriverInfo, WsMessage,
};
use crate::util::new_websocket_client;
use actix::prelude::{Actor, Context, Recipient};
use actix::{Addr, AsyncContext, SpawnHandle};
use handler::{AbortDriverSetup, SetupSession};
use log::{debug, error, info, warn};
use rust_fsm::*;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

state_machine! {
    derive(Debug)
    OperationMode(RequireSetup)

    RequireSetup => {
        ConfigurationAvailable => Running,
        SetupDriverRequest => SetupFlow [SetupFlowTimer],
    },
    Running(SetupDriverRequest) => SetupFlow [SetupFlowTimer],
    Running(ApiRequest) => Running,
    SetupFlow => {
        AbortSetup => RequireSetup,
        SetupError => RequireSetup,
        Successful => Running,
        RequestUserInput => WaitSetupUserData,
    },
    WaitSetupUserData => {
        SetupUserData => SetupFlow,
        AbortSetup => RequireSetup,
        SetupError => RequireSetup,
    },
}

struct ApiSession {
    recipient: Recipient<SendWsMessage>,
    standby: bool,
    /// Entity filter for `entity_change` events. Empty = all derived entities.
    subscribed_entities: HashSet<String>,
}

impl ApiSession {
    fn new(recipient: Recipient<SendWsMessage>) -> Self {
        Self {
            recipient,
            standby: false,
            subscribed_entities: Default::default(),
        }
    }
}

pub struct Controller {
    /// Active integration client WebSocket sessions
    sessions: HashMap<String, ApiSession>,
    /// Home Assistant connection state
    device_state: DeviceState,
    settings: Settings,
    /// Configured persons and the cache of their upstream entity states
    persons: PersonRegistry,
    /// WebSocket client
    // creating an expensive client is sufficient once per process and can be used to create multiple connections
    ws_client: awc::Client,
    /// HomeAssistant client actor
    ha_client: Option<Addr<HomeAssistantClient>>,
    ha_reconnect_duration: Duration,
    ha_reconnect_attempt: u32,
    drv_metadata: IntegrationDriverInfo,
    machine: StateMachine<OperationMode>,
    /// Active setup wizard session
    setup: Option<SetupSession>,
    setup_timeout: Option<SpawnHandle>,
}

impl Controller {
    pub fn new(settings: Settings, drv_metadata: IntegrationDriverInfo) -> Self {
        let mut machine = StateMachine::new();
        let persons = PersonRegistry::new(settings.persons.clone());
        // Skip the setup requirement if persons were already configured in an earlier run.
        if persons.is_configured() && !settings.hass.token.is_empty() {
            let _ = machine.consume(&OperationModeInput::ConfigurationAvailable);
        }
        Self {
            sessions: Default::default(),
            device_state: DeviceState::Disconnected,
            ws_client: new_websocket_client(Duration::from_secs(
                settings.hass.connection_timeout as u64,
            )),
            ha_reconnect_duration: settings.hass.reconnect.duration,
            settings,
            persons,
            ha_client: None,
            ha_reconnect_attempt: 0,
            drv_metadata,
            machine,
            setup: None,
            setup_timeout: None,
        }
    }

    /// Send a WebSocket message to an integration client
    fn send_api_msg(&self, message: WsMessage, ws_id: &str) {
        if let Some(session) = self.sessions.get(ws_id) {
            if session.standby {
                debug!("[{ws_id}] Client is in standby, not sending message: {message:?}");
                return;
            }
            if let Err(e) = session.recipient.try_send(SendWsMessage(message)) {
                error!("[{ws_id}] Internal message send error: {e}");
            }
        } else {
            warn!("attempting to send message but couldn't find session: {ws_id}");
        }
    }

    fn send_device_state(&self, ws_id: &str) {
        self.send_api_msg(
            WsMessage::event(
                "device_state",
                EventCategory::Device,
                json!({ "state": self.device_state }),
            ),
            ws_id,
        );
    }

    fn broadcast_device_state(&self) {
        for session in self.sessions.keys() {
            self.send_device_state(session);
        }
    }

    fn set_device_state(&mut self, state: DeviceState) {
        self.device_state = state;
        self.broadcast_device_state();
    }

    /// Push a derived entity change to all sessions subscribed to the entity.
    fn broadcast_entity_change(&self, change: &EntityChange) {
        let msg_data = match serde_json::to_value(change) {
            Ok(v) => v,
            Err(e) => {
                error!("Error serializing entity change: {e:?}");
                return;
            }
        };
        for (ws_id, session) in &self.sessions {
            if !session.subscribed_entities.is_empty()
                && !session.subscribed_entities.contains(&change.entity_id)
            {
                continue;
            }
            self.send_api_msg(
                WsMessage::event("entity_change", EventCategory::Entity, msg_data.clone()),
                ws_id,
            );
        }
    }

    fn increment_reconnect_timeout(&mut self) {
        let new_timeout = Duration::from_millis(
            (self.ha_reconnect_duration.as_millis() as f32
                * self.settings.hass.reconnect.backoff_factor) as u64,
        );

        self.ha_reconnect_duration = if new_timeout.gt(&self.settings.hass.reconnect.duration_max) {
            self.settings.hass.reconnect.duration_max
        } else {
            new_timeout
        };
        info!(
            "New reconnect timeout: {}",
            self.ha_reconnect_duration.as_millis()
        )
    }

    /// Feed an input to the operation mode state machine.
    ///
    /// An impossible transition is logged and returned as error. The `SetupFlowTimer` output
    /// (re)starts the setup timeout.
    pub(crate) fn sm_consume(
        &mut self,
        ws_id: &str,
        input: &OperationModeInput,
        ctx: &mut Context<Self>,
    ) -> Result<(), ()> {
        debug!(
            "State machine input: {input:?} (state: {:?})",
            self.machine.state()
        );
        match self.machine.consume(input) {
            Ok(None) => Ok(()),
            Ok(Some(OperationModeOutput::SetupFlowTimer)) => {
                self.start_setup_timeout(ws_id, ctx);
                Ok(())
            }
            Err(_) => {
                warn!(
                    "[{ws_id}] Transition {input:?} not allowed in state {:?}",
                    self.machine.state()
                );
                Err(())
            }
        }
    }

    fn start_setup_timeout(&mut self, ws_id: &str, ctx: &mut Context<Self>) {
        if let Some(handle) = self.setup_timeout.take() {
            ctx.cancel_future(handle);
        }
        let timeout = setup_timeout();
        debug!("[{ws_id}] Starting setup flow timeout: {timeout:?}");
        let ws_id = ws_id.to_string();
        self.setup_timeout = Some(ctx.run_later(timeout, move |_act, ctx| {
            ctx.notify(AbortDriverSetup {
                ws_id,
                timeout: true,
            });
        }));
    }

    /// Persist the Home Assistant settings and person records to the user settings file.
    fn persist_configuration(&self) {
        if let Err(e) = save_user_settings(&self.settings.hass, self.persons.records()) {
            error!("Error persisting configuration: {e}");
        }
    }

    /// Propagate the watched upstream entities of all configured persons to the HA client.
    fn update_watched_entities(&self) {
        if let Some(ha_client) = &self.ha_client {
            ha_client.do_send(crate::client::messages::SubscribedEntities {
                entity_ids: self.persons.watched_entities(),
            });
        }
    }
}

impl Actor for Controller {
    type Context = Context<Self>;
}
