// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Home Assistant client WebSocket API implementation with Actix actors.

use std::collections::HashSet;
use std::time::Instant;

use actix::io::SinkWrite;
use actix::{Actor, ActorContext, Addr, AsyncContext, Context};
use actix_codec::Framed;
use awc::ws::Codec;
use awc::{ws, BoxedSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use log::{debug, error, info, warn};
use messages::Close;
use serde::de::Error;
use serde_json::{json, Map, Value};
use url::Url;

use crate::client::messages::{ConnectionEvent, ConnectionState, UpstreamEvent};
use crate::client::model::Event;
use crate::errors::ServiceError;
use crate::configuration::{HeartbeatSettings, ENV_HASS_MSG_TRACING};
use crate::persons::STATE_UNKNOWN;
use crate::util::tracing_from_env;
use crate::Controller;

mod actor;
mod close_handler;
mod entity_registry;
mod get_states;
pub mod messages;
pub mod model;
mod streamhandler;
mod subscribed_entities;

pub struct HomeAssistantClient {
    /// Unique HA client id
    id: String,
    /// HA request message id
    ws_id: u32,
    access_token: String,
    subscribed_events: bool,
    /// request id of the last `subscribe_events` request. This id will be used in the result and event messages.
    subscribe_events_id: Option<u32>,
    /// request id of the last `get_states` request. This id will be used in the result message.
    entity_states_id: Option<u32>,
    /// request id of the last `config/entity_registry/list` request.
    entity_registry_id: Option<u32>,
    /// Upstream entity ids of the configured persons. Events of other entities are filtered out.
    watched_entities: HashSet<String>,
    sink: SinkWrite<ws::Message, SplitSink<Framed<BoxedSocket, Codec>, ws::Message>>,
    controller_actor: Addr<Controller>,
    /// Last heart beat timestamp.
    last_hb: Instant,
    heartbeat: HeartbeatSettings,
    msg_tracing: bool,
}

impl HomeAssistantClient {
    pub fn start(
        url: Url,
        controller_actor: Addr<Controller>,
        access_token: String,
        watched_entities: HashSet<String>,
        sink: SplitSink<Framed<BoxedSocket, Codec>, ws::Message>,
        stream: SplitStream<Framed<BoxedSocket, Codec>>,
        heartbeat: HeartbeatSettings,
    ) -> Addr<Self> {
        HomeAssistantClient::create(|ctx| {
            ctx.add_stream(stream);
            let host = url.host_str().unwrap_or(url.as_str());
            let port = url.port_or_known_default().unwrap_or_default();
            HomeAssistantClient {
                id: format!("{host}:{port}"),
                ws_id: 0,
                access_token,
                subscribed_events: false,
                subscribe_events_id: None,
                entity_states_id: None,
                entity_registry_id: None,
                watched_entities,
                sink: SinkWrite::new(sink, ctx),
                controller_actor,
                last_hb: Instant::now(),
                heartbeat,
                msg_tracing: tracing_from_env(ENV_HASS_MSG_TRACING),
            }
        })
    }

    fn new_msg_id(&mut self) -> u32 {
        self.ws_id += 1;
        self.ws_id
    }

    fn heartbeat(&self, ctx: &mut Context<Self>) {
        ctx.run_later(self.heartbeat.interval, |act, ctx| {
            // check server heartbeats
            if Instant::now().duration_since(act.last_hb) > act.heartbeat.timeout {
                // heartbeat timed out
                error!(
                    "[{}] Websocket server heartbeat failed, disconnecting!",
                    act.id
                );

                // Stop sending pings & Stop actor
                ctx.stop();
                return;
            }

            if act
                .send_message(ws::Message::Ping(Bytes::new()), "Ping", ctx)
                .is_ok()
            {
                act.heartbeat(ctx);
            }
        });
    }

    fn on_text_message(&mut self, txt: Bytes, ctx: &mut Context<HomeAssistantClient>) {
        if self.msg_tracing {
            debug!("[{}] -> Text msg: {txt:?}", self.id);
        }

        let mut msg = match json_object_from_text_msg(&self.id, txt.as_ref()) {
            Ok(m) => m,
            Err(_) => {
                ctx.notify(Close::invalid());
                return;
            }
        };

        let object_msg = msg.as_object_mut().unwrap(); // is_object() checked in json_object_from_text_msg!

        let id = object_msg
            .get("id")
            .and_then(|v| v.as_u64())
            .unwrap_or_default() as u32;
        match object_msg
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
        {
            "event" => {
                if Some(id) != self.subscribe_events_id {
                    debug!(
                        "[{}] Ignoring event with non matching event subscription id",
                        self.id
                    );
                    return;
                }
                let event = serde_json::from_value::<Event>(
                    object_msg.remove("event").unwrap_or(Value::Null),
                );
                if let Ok(event) = event {
                    if let Err(e) = self.handle_event(event) {
                        error!(
                            "[{}] Error handling HA state_changed event: {e:?}",
                            self.id
                        );
                    }
                }
            }
            "result" => {
                let success = object_msg
                    .get("success")
                    .and_then(|v| v.as_bool())
                    .unwrap_or_default();
                if Some(id) == self.subscribe_events_id {
                    self.subscribed_events = success;
                    if self.subscribed_events {
                        debug!("[{}] Subscribed to state changes", self.id);
                        self.controller_actor.do_send(ConnectionEvent {
                            client_id: self.id.clone(),
                            state: ConnectionState::Connected,
                        });
                    } else {
                        ctx.notify(Close::invalid());
                    }
                } else if Some(id) == self.entity_states_id {
                    self.entity_states_id = None;
                    if !success {
                        error!("[{}] get_states request failed", self.id);
                        ctx.notify(Close::invalid());
                        return;
                    }

                    if let Some(entities) =
                        object_msg.get_mut("result").and_then(|v| v.as_array_mut())
                    {
                        let entities: Vec<Value> = entities.iter_mut().map(|v| v.take()).collect();
                        if let Err(e) = self.handle_get_states_result(entities) {
                            error!("[{}] Error handling HA get_states result: {e:?}", self.id);
                        }
                    }
                } else if Some(id) == self.entity_registry_id {
                    self.entity_registry_id = None;
                    // Registry access is best effort: the setup wizard degrades to manual
                    // Wi-Fi sensor selection on an empty result.
                    let entries = if success {
                        object_msg
                            .get_mut("result")
                            .and_then(|v| v.as_array_mut())
                            .map(|entries| entries.iter_mut().map(|v| v.take()).collect())
                            .unwrap_or_default()
                    } else {
                        error!("[{}] entity registry request failed", self.id);
                        Vec::new()
                    };
                    if let Err(e) = self.handle_entity_registry_result(entries) {
                        error!(
                            "[{}] Error handling HA entity registry result: {e:?}",
                            self.id
                        );
                    }
                }
            }
            "auth_required" => {
                if let Err(e) = self.send_json(
                    json!({ "type": "auth", "access_token": self.access_token}),
                    ctx,
                ) {
                    error!("[{}] Error sending auth to HA: {e:?}", self.id);
                    ctx.notify(Close::invalid());
                }
            }
            "auth_invalid" => {
                error!("[{}] Invalid authentication", self.id);
                self.controller_actor.do_send(ConnectionEvent {
                    client_id: self.id.clone(),
                    state: ConnectionState::AuthenticationFailed,
                });
            }
            "auth_ok" => {
                info!("[{}] Authentication OK", self.id);

                if !self.subscribed_events {
                    self.subscribe_events_id = Some(self.new_msg_id());
                    if let Err(e) = self.send_json(
                        json!({
                          "id": self.subscribe_events_id.unwrap(),
                          "type": "subscribe_events",
                          "event_type": "state_changed"
                        }),
                        ctx,
                    ) {
                        error!(
                            "[{}] Error sending subscribe_events to HA: {e:?}",
                            self.id
                        );
                        ctx.notify(Close::invalid());
                    }
                }
            }
            _ => {}
        }
    }

    /// Forward a watched `state_changed` event to the controller.
    ///
    /// A removed entity (`new_state: null`) is reported with an `unknown` state.
    fn handle_event(&mut self, event: Event) -> Result<(), ServiceError> {
        let data = event.data;
        if data.entity_id.is_empty() {
            return Err(ServiceError::BadRequest(
                "Missing entity_id in state_changed event".into(),
            ));
        }

        if !self.watched_entities.contains(&data.entity_id) {
            return Ok(());
        }

        let (state, attributes) = match data.new_state {
            Some(new_state) => (new_state.state, new_state.attributes.unwrap_or_default()),
            None => (STATE_UNKNOWN.to_string(), Map::new()),
        };

        self.controller_actor.try_send(UpstreamEvent {
            client_id: self.id.clone(),
            entity_id: data.entity_id,
            state,
            attributes,
        })?;

        Ok(())
    }

    fn on_binary_message(&mut self, _: Bytes, ctx: &mut Context<HomeAssistantClient>) {
        error!("[{}] Binary messages not supported! Disconnecting", self.id);
        ctx.notify(Close::unsupported());
    }

    fn on_ping_message(&mut self, bytes: Bytes, ctx: &mut Context<HomeAssistantClient>) {
        // HA doesn't seem to initiate pings, but this might change in the future...
        debug!("[{}] -> Ping", self.id);
        self.last_hb = Instant::now();
        let _ = self.send_message(ws::Message::Pong(bytes), "Pong", ctx);
    }

    fn on_pong_message(&mut self, _: Bytes, _: &mut Context<HomeAssistantClient>) {
        debug!("[{}] -> Pong", self.id);
        self.last_hb = Instant::now();
    }

    fn send_json(
        &mut self,
        msg: Value,
        ctx: &mut Context<HomeAssistantClient>,
    ) -> Result<(), ServiceError> {
        let obj = msg.as_object().ok_or(ServiceError::BadRequest(
            "json message must be an object".into(),
        ))?;
        let name = obj.get("type").and_then(|v| v.as_str()).unwrap_or("?");
        // hide access token in tracing mode
        if self.msg_tracing && !obj.contains_key("access_token") {
            debug!("[{}] <- {msg:?}", self.id);
        } else {
            debug!("[{}] <- {name}", self.id);
        }
        if self
            .sink
            .write(ws::Message::Text(msg.to_string().into()))
            .is_err()
        {
            // sink is closed or closing, no chance to send a Close message
            warn!("[{}] Could not send {name}, closing connection", self.id);
            ctx.stop();
            return Err(ServiceError::NotConnected);
        }
        Ok(())
    }

    fn send_message(
        &mut self,
        msg: ws::Message,
        name: &str,
        ctx: &mut Context<HomeAssistantClient>,
    ) -> Result<(), ServiceError> {
        if self.msg_tracing {
            debug!("[{}] <- {msg:?}", self.id);
        } else {
            debug!("[{}] <- {name}", self.id);
        }
        if self.sink.write(msg).is_err() {
            // sink is closed or closing, no chance to send a Close message
            warn!("[{}] Could not send {name}, closing connection", self.id);
            ctx.stop();
            return Err(ServiceError::NotConnected);
        }
        Ok(())
    }
}

pub fn json_object_from_text_msg(id: &str, txt: &[u8]) -> Result<Value, serde_json::Error> {
    let msg: Value = match serde_json::from_slice(txt) {
        Ok(v) => v,
        Err(e) => {
            warn!("[{id}] Error parsing json message: {e:?}");
            return Err(e);
        }
    };

    if !msg.is_object() {
        warn!("[{id}] Expected json object but got: {msg:?}");
        return Err(serde_json::Error::custom("expected json object in root"));
    }

    Ok(msg)
}
