// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Driver setup flow handling.
//!
//! The setup wizard collects the Home Assistant connection, the person and device tracker
//! entities, tries to auto-detect the matching Wi-Fi SSID sensor from the entity registry
//! and asks for a category label. Screens are driven with `driver_setup_change` events and
//! answered with `set_driver_user_data` requests.

use crate::client::messages::EntityRegistry;
use crate::configuration::save_user_settings;
use crate::controller::handler::{
    AbortDriverSetup, ConnectMsg, DisconnectMsg, SetDriverUserDataMsg, SetupDriverMsg,
};
use crate::controller::{Controller, OperationModeInput::*, OperationModeState};
use crate::errors::{ServiceError, ServiceError::BadRequest};
use crate::persons::{default_category, object_id, wifi, PersonConfig};
use crate::server::{
    DeviceState, DriverSetupChange, EventCategory, IntegrationSetup, IntegrationSetupError,
    IntegrationSetupState, SetupChangeEventType, WsMessage, WsResultMsgData,
};
use actix::{AsyncContext, Handler, Message};
use derive_more::Constructor;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Dropdown item id for switching to manual Wi-Fi sensor selection.
const MANUAL_SELECTION: &str = "select_manually";
/// Dropdown item id for entering a new category.
const NEW_CATEGORY: &str = "new_category";

/// Wizard page the driver is waiting input for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SetupStep {
    WifiDetection,
    WifiFallback,
    ManualWifi,
    Category,
    NewCategory,
}

/// Collected answers of the running setup wizard.
#[derive(Debug)]
pub(crate) struct SetupSession {
    pub ws_id: String,
    pub step: SetupStep,
    pub person: String,
    pub device_tracker: String,
    pub places_entity: Option<String>,
    pub wifi_sensor: Option<String>,
    pub wifi_candidates: Vec<String>,
    pub person_name: Option<String>,
    pub category: Option<String>,
}

/// Local Actix message to show the Wi-Fi sensor fallback selection screen.
#[derive(Constructor, Message)]
#[rtype(result = "()")]
struct RequestWifiFallbackMsg {
    pub ws_id: String,
}

/// Local Actix message to show the manual Wi-Fi sensor input screen.
#[derive(Constructor, Message)]
#[rtype(result = "()")]
struct RequestManualWifiMsg {
    pub ws_id: String,
}

/// Local Actix message to show the category selection screen.
#[derive(Constructor, Message)]
#[rtype(result = "()")]
struct RequestCategoryMsg {
    pub ws_id: String,
}

/// Local Actix message to show the new category input screen.
#[derive(Constructor, Message)]
#[rtype(result = "()")]
struct RequestNewCategoryMsg {
    pub ws_id: String,
}

/// Local Actix message to finish setup flow.
#[derive(Constructor, Message)]
#[rtype(result = "()")]
pub(crate) struct FinishSetupFlowMsg {
    pub ws_id: String,
    pub error: Option<IntegrationSetupError>,
}

/// Start the driver setup flow.
///
/// Validates the Home Assistant connection and entity references, then (re)connects to HA
/// with the new credentials. The wizard continues when the entity registry result arrives.
impl Handler<SetupDriverMsg> for Controller {
    type Result = Result<Option<WsMessage>, ServiceError>;

    fn handle(&mut self, msg: SetupDriverMsg, ctx: &mut Self::Context) -> Self::Result {
        debug!("[{}] setup driver, reconfigure: {:?}", msg.ws_id, msg.data.reconfigure);

        if self
            .sm_consume(&msg.ws_id, &SetupDriverRequest, ctx)
            .is_err()
        {
            return Err(BadRequest(
                "Cannot start driver setup. Please abort setup first.".into(),
            ));
        }

        let mut cfg = self.settings.hass.clone();

        // validate setup data
        cfg.url = validate_url(msg.data.setup_data.get("url").map(|u| u.as_str()))?;

        if let Some(token) = msg.data.setup_data.get("token").map(|t| t.trim()) {
            if token.is_empty() && !cfg.token.is_empty() {
                warn!(
                    "[{}] no token value provided in setup, using existing token",
                    msg.ws_id
                )
            } else if !token.is_empty() {
                cfg.token = token.to_string();
            } else {
                return Err(BadRequest("Missing token".into()));
            }
        } else if cfg.token.is_empty() {
            return Err(BadRequest("Missing field: token".into()));
        }

        let person = validate_entity_id(
            msg.data.setup_data.get("person").map(String::as_str),
            "person",
            "person",
        )?;
        let device_tracker = validate_entity_id(
            msg.data.setup_data.get("device_tracker").map(String::as_str),
            "device_tracker",
            "device_tracker",
        )?;
        let places_entity = match msg
            .data
            .setup_data
            .get("places_entity")
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            Some(v) => Some(validate_entity_id(Some(v), "sensor", "places_entity")?),
            None => None,
        };

        save_user_settings(&cfg, self.persons.records())?;
        self.settings.hass = cfg;

        self.setup = Some(SetupSession {
            ws_id: msg.ws_id.clone(),
            step: SetupStep::WifiDetection,
            person,
            device_tracker,
            places_entity,
            wifi_sensor: None,
            wifi_candidates: Vec::new(),
            person_name: None,
            category: None,
        });

        // (Re)connect with the new settings. Closing an active connection triggers the
        // reconnect in the Closed event since the device state is set to connecting.
        self.set_device_state(DeviceState::Connecting);
        if self.ha_client.is_some() {
            info!("Disconnecting from HA during setup-flow");
            ctx.notify(DisconnectMsg {});
        } else {
            ctx.notify(ConnectMsg::default());
        }

        // this will acknowledge the setup_driver request message
        Ok(Some(WsMessage::response(
            msg.req_id,
            "result",
            WsResultMsgData::ok("Setup started"),
        )))
    }
}

/// Continue the wizard with the entity registry result.
///
/// A single unambiguous Wi-Fi sensor match is selected automatically, otherwise the user
/// picks from the candidate list.
impl Handler<EntityRegistry> for Controller {
    type Result = ();

    fn handle(&mut self, msg: EntityRegistry, ctx: &mut Self::Context) -> Self::Result {
        let setup = match self.setup.as_mut() {
            Some(s) if s.step == SetupStep::WifiDetection => s,
            _ => {
                debug!(
                    "[{}] Ignoring entity registry result without active Wi-Fi detection",
                    msg.client_id
                );
                return;
            }
        };

        setup.person_name = msg
            .entries
            .iter()
            .find(|e| e.entity_id == setup.person)
            .and_then(|e| e.original_name.clone());

        let ws_id = setup.ws_id.clone();
        match wifi::tracker_device_id(&msg.entries, &setup.device_tracker) {
            Some(device_id) => {
                let matches = wifi::priority_matches(&msg.entries, device_id);
                if matches.len() == 1 {
                    debug!("[{ws_id}] Auto-selected Wi-Fi sensor: {}", matches[0]);
                    setup.wifi_sensor = matches.into_iter().next();
                    ctx.notify(RequestCategoryMsg::new(ws_id));
                } else {
                    debug!(
                        "[{ws_id}] {} priority Wi-Fi sensor match(es), asking user",
                        matches.len()
                    );
                    setup.wifi_candidates = wifi::fallback_candidates(&msg.entries, device_id);
                    ctx.notify(RequestWifiFallbackMsg::new(ws_id));
                }
            }
            None => {
                warn!("[{ws_id}] Device tracker not found in entity registry");
                setup.wifi_candidates = Vec::new();
                ctx.notify(RequestWifiFallbackMsg::new(ws_id));
            }
        }
    }
}

/// Handle driver setup input data from the wizard screens.
///
/// Validate and store the entered data, then continue with the next screen or trigger the
/// end of the setup flow with [FinishSetupFlowMsg].
impl Handler<SetDriverUserDataMsg> for Controller {
    type Result = Result<Option<WsMessage>, ServiceError>;

    fn handle(&mut self, msg: SetDriverUserDataMsg, ctx: &mut Self::Context) -> Self::Result {
        debug!("[{}] set driver user data", msg.ws_id);

        if self.sm_consume(&msg.ws_id, &SetupUserData, ctx).is_err() {
            return Err(BadRequest(
                "Not waiting for driver user data. Please restart setup.".into(),
            ));
        }

        let values = match msg.data {
            IntegrationSetup::InputValues(values) => values,
            IntegrationSetup::Confirm(_) => {
                return Err(BadRequest("Invalid response: require input_values".into()))
            }
        };

        let setup = self
            .setup
            .as_mut()
            .ok_or_else(|| BadRequest("No active setup session".into()))?;
        let ws_id = msg.ws_id.clone();
        // use a delay that the ack response will be sent first
        let delay = Duration::from_millis(100);

        match setup.step {
            SetupStep::WifiDetection => {
                return Err(BadRequest("Not waiting for user input".into()));
            }
            SetupStep::WifiFallback => {
                let selected = values
                    .get("wifi_sensor")
                    .map(|v| v.trim())
                    .unwrap_or_default();
                if selected == MANUAL_SELECTION {
                    ctx.notify_later(RequestManualWifiMsg::new(ws_id), delay);
                } else {
                    setup.wifi_sensor =
                        Some(validate_entity_id(Some(selected), "sensor", "wifi_sensor")?);
                    ctx.notify_later(RequestCategoryMsg::new(ws_id), delay);
                }
            }
            SetupStep::ManualWifi => {
                setup.wifi_sensor = Some(validate_entity_id(
                    values.get("wifi_sensor").map(String::as_str),
                    "sensor",
                    "wifi_sensor",
                )?);
                ctx.notify_later(RequestCategoryMsg::new(ws_id), delay);
            }
            SetupStep::Category => {
                let selected = values
                    .get("selected_category")
                    .map(|v| v.trim())
                    .unwrap_or_default();
                if selected == NEW_CATEGORY {
                    ctx.notify_later(RequestNewCategoryMsg::new(ws_id), delay);
                } else if selected.is_empty() {
                    return Err(BadRequest("Missing field: selected_category".into()));
                } else {
                    setup.category = Some(selected.to_string());
                    ctx.notify_later(FinishSetupFlowMsg::new(ws_id, None), delay);
                }
            }
            SetupStep::NewCategory => {
                let category = values.get("category").map(|v| v.trim()).unwrap_or_default();
                setup.category = Some(if category.is_empty() {
                    default_category()
                } else {
                    category.to_string()
                });
                ctx.notify_later(FinishSetupFlowMsg::new(ws_id, None), delay);
            }
        }

        // this will acknowledge the set_driver_user_data request message
        Ok(Some(WsMessage::response(
            msg.req_id,
            "result",
            WsResultMsgData::ok("User data received"),
        )))
    }
}

/// Send the Wi-Fi sensor fallback selection screen.
impl Handler<RequestWifiFallbackMsg> for Controller {
    type Result = ();

    fn handle(&mut self, msg: RequestWifiFallbackMsg, ctx: &mut Self::Context) -> Self::Result {
        if self.sm_consume(&msg.ws_id, &RequestUserInput, ctx).is_err() {
            return;
        }

        let candidates = match self.setup.as_mut() {
            Some(setup) => {
                setup.step = SetupStep::WifiFallback;
                setup.wifi_candidates.clone()
            }
            None => return,
        };

        let mut items: Vec<Value> = candidates
            .iter()
            .map(|id| json!({"id": id, "label": {"en": id}}))
            .collect();
        items.push(json!({"id": MANUAL_SELECTION, "label": {"en": "Select manually"}}));
        let value = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| MANUAL_SELECTION.into());

        let event = WsMessage::event(
            "driver_setup_change",
            EventCategory::Device,
            json!({
                "event_type": SetupChangeEventType::Setup,
                "state": IntegrationSetupState::WaitUserAction,
                "require_user_action": {
                    "input": {
                        "title": {
                            "en": "Wi-Fi SSID sensor"
                        },
                        "settings": [
                            {
                                "id": "wifi_sensor",
                                "label": {
                                    "en": "Sensor reporting the connected Wi-Fi network"
                                },
                                "field": {
                                    "dropdown": {
                                        "value": value,
                                        "items": items
                                    }
                                }
                            }
                        ]
                    }
                }
            }),
        );
        self.send_api_msg(event, &msg.ws_id);
    }
}

/// Send the manual Wi-Fi sensor input screen.
impl Handler<RequestManualWifiMsg> for Controller {
    type Result = ();

    fn handle(&mut self, msg: RequestManualWifiMsg, ctx: &mut Self::Context) -> Self::Result {
        if self.sm_consume(&msg.ws_id, &RequestUserInput, ctx).is_err() {
            return;
        }
        if let Some(setup) = self.setup.as_mut() {
            setup.step = SetupStep::ManualWifi;
        } else {
            return;
        }

        let event = WsMessage::event(
            "driver_setup_change",
            EventCategory::Device,
            json!({
                "event_type": SetupChangeEventType::Setup,
                "state": IntegrationSetupState::WaitUserAction,
                "require_user_action": {
                    "input": {
                        "title": {
                            "en": "Wi-Fi SSID sensor"
                        },
                        "settings": [
                            {
                                "id": "wifi_sensor",
                                "label": {
                                    "en": "Sensor entity id, e.g. sensor.phone_ssid"
                                },
                                "field": {
                                    "text": {
                                        "value": ""
                                    }
                                }
                            }
                        ]
                    }
                }
            }),
        );
        self.send_api_msg(event, &msg.ws_id);
    }
}

/// Send the category selection screen with the categories of all configured persons.
impl Handler<RequestCategoryMsg> for Controller {
    type Result = ();

    fn handle(&mut self, msg: RequestCategoryMsg, ctx: &mut Self::Context) -> Self::Result {
        if self.sm_consume(&msg.ws_id, &RequestUserInput, ctx).is_err() {
            return;
        }
        if let Some(setup) = self.setup.as_mut() {
            setup.step = SetupStep::Category;
        } else {
            return;
        }

        let categories = self.persons.categories();
        let mut items: Vec<Value> = categories
            .iter()
            .map(|c| json!({"id": c, "label": {"en": c}}))
            .collect();
        items.push(json!({"id": NEW_CATEGORY, "label": {"en": "New Category"}}));
        let value = categories
            .first()
            .cloned()
            .unwrap_or_else(|| NEW_CATEGORY.into());

        let event = WsMessage::event(
            "driver_setup_change",
            EventCategory::Device,
            json!({
                "event_type": SetupChangeEventType::Setup,
                "state": IntegrationSetupState::WaitUserAction,
                "require_user_action": {
                    "input": {
                        "title": {
                            "en": "Person category"
                        },
                        "settings": [
                            {
                                "id": "selected_category",
                                "label": {
                                    "en": "Category of this person"
                                },
                                "field": {
                                    "dropdown": {
                                        "value": value,
                                        "items": items
                                    }
                                }
                            }
                        ]
                    }
                }
            }),
        );
        self.send_api_msg(event, &msg.ws_id);
    }
}

/// Send the new category input screen.
impl Handler<RequestNewCategoryMsg> for Controller {
    type Result = ();

    fn handle(&mut self, msg: RequestNewCategoryMsg, ctx: &mut Self::Context) -> Self::Result {
        if self.sm_consume(&msg.ws_id, &RequestUserInput, ctx).is_err() {
            return;
        }
        if let Some(setup) = self.setup.as_mut() {
            setup.step = SetupStep::NewCategory;
        } else {
            return;
        }

        let event = WsMessage::event(
            "driver_setup_change",
            EventCategory::Device,
            json!({
                "event_type": SetupChangeEventType::Setup,
                "state": IntegrationSetupState::WaitUserAction,
                "require_user_action": {
                    "input": {
                        "title": {
                            "en": "New Category"
                        },
                        "settings": [
                            {
                                "id": "category",
                                "label": {
                                    "en": "Category label"
                                },
                                "field": {
                                    "text": {
                                        "value": default_category()
                                    }
                                }
                            }
                        ]
                    }
                }
            }),
        );
        self.send_api_msg(event, &msg.ws_id);
    }
}

/// Finish the setup flow.
///
/// On success the person record is stored, the configuration persisted and the upstream
/// entity watch list refreshed. A `driver_setup_change` STOP event reports the outcome.
impl Handler<FinishSetupFlowMsg> for Controller {
    type Result = ();

    fn handle(&mut self, msg: FinishSetupFlowMsg, ctx: &mut Self::Context) -> Self::Result {
        let input = if msg.error.is_none() {
            Successful
        } else {
            SetupError
        };
        if self.sm_consume(&msg.ws_id, &input, ctx).is_err() {
            return;
        }

        if msg.error.is_none() {
            if let Some(setup) = self.setup.take() {
                let name = setup
                    .person_name
                    .or_else(|| self.persons.person_name(&setup.person))
                    .unwrap_or_else(|| object_id(&setup.person).to_string());
                let record = PersonConfig {
                    person: setup.person,
                    device_tracker: setup.device_tracker,
                    wifi_sensor: setup.wifi_sensor,
                    places_entity: setup.places_entity,
                    category: setup.category.unwrap_or_else(default_category),
                    name,
                };
                info!("Setup flow finished for {}", record.person);
                self.persons.upsert(record);
                self.persist_configuration();
                self.update_watched_entities();
                if let Some(ha_client) = &self.ha_client {
                    ha_client.do_send(crate::client::messages::GetStates);
                }
            }
        } else {
            self.setup = None;
        }

        if let Some(handle) = self.setup_timeout.take() {
            ctx.cancel_future(handle);
        }

        let state = if msg.error.is_none() {
            IntegrationSetupState::Ok
        } else {
            IntegrationSetupState::Error
        };
        info!("Setup flow finished: sending driver_setup_change STOP with state {state}");
        let event = WsMessage::event(
            "driver_setup_change",
            EventCategory::Device,
            serde_json::to_value(DriverSetupChange {
                event_type: SetupChangeEventType::Stop,
                state,
                error: msg.error,
                require_user_action: None,
            })
            .expect("DriverSetupChange serialize error"),
        );
        self.send_api_msg(event, &msg.ws_id);
    }
}

impl Handler<AbortDriverSetup> for Controller {
    type Result = ();

    fn handle(&mut self, msg: AbortDriverSetup, ctx: &mut Self::Context) -> Self::Result {
        debug!(
            "[{}] abort driver setup request, timeout: {}",
            msg.ws_id, msg.timeout
        );

        if msg.timeout {
            if self.setup.is_some() {
                // notify the client that we ran into a timeout, state machine input is
                // consumed by the finish handler
                ctx.notify(FinishSetupFlowMsg {
                    ws_id: msg.ws_id,
                    error: Some(IntegrationSetupError::Timeout),
                });
            } else {
                // setup data validation failed earlier, only the state machine needs a reset
                let _ = self.sm_consume(&msg.ws_id, &SetupError, ctx);
                if let Some(handle) = self.setup_timeout.take() {
                    ctx.cancel_future(handle);
                }
            }
            return;
        }

        // abort: client aborted setup flow
        if self.sm_consume(&msg.ws_id, &AbortSetup, ctx).is_err() {
            return;
        }
        self.setup = None;

        // Continue normal operation if the service was already configured. Otherwise
        // requesting entities in the client would keep reporting "setup required".
        if matches!(self.machine.state(), &OperationModeState::RequireSetup)
            && self.persons.is_configured()
            && !self.settings.hass.token.is_empty()
        {
            let _ = self.sm_consume(&msg.ws_id, &ConfigurationAvailable, ctx);
            ctx.notify(ConnectMsg::default());
        }

        if let Some(handle) = self.setup_timeout.take() {
            ctx.cancel_future(handle);
        }
    }
}

/// Validate an entity id setup field: non-empty and of the expected domain.
fn validate_entity_id(
    value: Option<&str>,
    domain: &str,
    field: &str,
) -> Result<String, ServiceError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(BadRequest(format!("Missing field: {field}")));
    }
    match value.split_once('.') {
        Some((d, object)) if d == domain && !object.is_empty() => Ok(value.to_string()),
        _ => Err(BadRequest(format!(
            "Invalid {field} entity id: {value}. Expected domain: {domain}"
        ))),
    }
}

/// Validate and convert Home Assistant WebSocket URL
fn validate_url<'a>(addr: impl Into<Option<&'a str>>) -> Result<Url, ServiceError> {
    let addr = match addr.into() {
        None => return Err(BadRequest("Missing field: url".into())),
        Some(addr) => addr.trim(),
    };

    // user provided URL might missing scheme
    let mut url = match Url::parse(addr) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => parse_with_ws_scheme(addr)?,
        Err(e) => {
            warn!("Invalid WebSocket URL '{addr}': {e}");
            return Err(e.into());
        }
    };

    // quirk of URL parsing: hostname:port detects the hostname as scheme!
    if url.host_str().is_none() {
        url = parse_with_ws_scheme(addr)?;
    }

    match url.scheme() {
        "http" => {
            let _ = url.set_scheme("ws");
        }
        "https" => {
            let _ = url.set_scheme("wss");
        }
        "ws" | "wss" => { /* ok */ }
        _ => {
            return Err(BadRequest(
                "Invalid scheme, allowed: ws, wss, http, https".into(),
            ))
        }
    }

    Ok(url)
}

fn parse_with_ws_scheme(address: &str) -> Result<Url, url::ParseError> {
    let address = format!("ws://{address}");
    Url::parse(&address).map_err(|e| {
        warn!("Invalid URL '{address}': {e}");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::{validate_entity_id, validate_url};
    use crate::errors::{ServiceError, ServiceError::BadRequest};
    use url::Url;

    fn url(url: &str) -> Result<Url, ServiceError> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(e) => panic!("valid URL required! {e}"),
        }
    }

    #[test]
    fn empty_address_returns_error() {
        let result = validate_url(None);
        assert!(matches!(result, Err(BadRequest(_))));
        let result = validate_url("");
        assert!(matches!(result, Err(BadRequest(_))));
        let result = validate_url("  ");
        assert!(matches!(result, Err(BadRequest(_))));
    }

    #[test]
    fn host_only() {
        assert_eq!(url("ws://test/"), validate_url("test"));
    }

    #[test]
    fn valid_address_returns_url() {
        assert_eq!(
            url("ws://homeassistant.local:8123/api/websocket"),
            validate_url("ws://homeassistant.local:8123/api/websocket")
        );
    }

    #[test]
    fn address_with_spaces_are_trimmed() {
        assert_eq!(url("ws://test/"), validate_url("  test   "));
        assert_eq!(
            url("ws://homeassistant.local:8123/api/websocket"),
            validate_url("  ws://homeassistant.local:8123/api/websocket   ")
        );
    }

    #[test]
    fn host_only_with_port() {
        assert_eq!(url("ws://test:8123/"), validate_url("test:8123"));
    }

    #[test]
    fn ip_address_only() {
        assert_eq!(url("ws://127.0.0.1/"), validate_url("127.0.0.1"));
    }

    #[test]
    fn ip_address_only_with_port() {
        assert_eq!(url("ws://127.0.0.1:123/"), validate_url("127.0.0.1:123"));
    }

    #[test]
    fn add_scheme_if_missing() {
        assert_eq!(url("ws://test:123/foo"), validate_url("test:123/foo"));
    }

    #[test]
    fn force_ws_scheme_from_http() {
        assert_eq!(url("ws://test/"), validate_url("http://test"));
        assert_eq!(url("wss://test/"), validate_url("https://test"));
        assert_eq!(url("ws://test/"), validate_url("HTTP://test"));
        assert_eq!(url("wss://test/"), validate_url("HTTPS://test"));
    }

    #[test]
    fn invalid_scheme_returns_error() {
        let result = validate_url("foo://test");
        assert!(matches!(result, Err(BadRequest(_))));
    }

    #[test]
    fn missing_entity_id_returns_error() {
        let result = validate_entity_id(None, "person", "person");
        assert!(matches!(result, Err(BadRequest(_))));
        let result = validate_entity_id(Some("  "), "person", "person");
        assert!(matches!(result, Err(BadRequest(_))));
    }

    #[test]
    fn entity_id_domain_is_enforced() {
        assert_eq!(
            Ok("person.john".to_string()),
            validate_entity_id(Some("person.john"), "person", "person")
        );
        let result = validate_entity_id(Some("sensor.john"), "person", "person");
        assert!(matches!(result, Err(BadRequest(_))));
        let result = validate_entity_id(Some("person."), "person", "person");
        assert!(matches!(result, Err(BadRequest(_))));
        let result = validate_entity_id(Some("john"), "person", "person");
        assert!(matches!(result, Err(BadRequest(_))));
    }

    #[test]
    fn entity_id_is_trimmed() {
        assert_eq!(
            Ok("device_tracker.phone".to_string()),
            validate_entity_id(Some(" device_tracker.phone "), "device_tracker", "tracker")
        );
    }
}
