// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for [ApiRequestMsg].

use crate::client::messages::GetStates;
use crate::controller::handler::{EntityCommandMsg, SetDriverUserDataMsg, SetupDriverMsg};
use crate::controller::{ApiRequestMsg, Controller, OperationModeInput, WsRequest};
use crate::errors::ServiceError;
use crate::server::{
    AvailableEntitiesMsgData, EntityCommand, IntegrationVersion, SubscribeEvents, WsMessage,
    WsResultMsgData, API_VERSION,
};
use crate::util::DeserializeMsgData;
use crate::APP_VERSION;
use actix::{AsyncContext, Handler, ResponseFuture};
use log::{debug, error};
use strum::EnumMessage;

impl Handler<ApiRequestMsg> for Controller {
    type Result = ResponseFuture<Result<Option<WsMessage>, ServiceError>>;

    fn handle(&mut self, msg: ApiRequestMsg, ctx: &mut Self::Context) -> Self::Result {
        debug!("ApiRequestMsg: {:?}", msg.request);
        // extra safety: if we get a request, the client is certainly not in standby mode
        if let Some(session) = self.sessions.get_mut(&msg.ws_id) {
            session.standby = false;
        } else {
            error!("Can't handle ApiRequestMsg without a session!");
            return Box::pin(std::future::ready(Ok(None)));
        }

        let resp_msg = msg
            .request
            .get_message()
            .expect("WsRequest variants must have an associated message");

        // handle metadata requests which can always be sent by a client, no matter if the
        // driver is in "setup flow" or "running" mode
        let result = match msg.request {
            WsRequest::GetDriverVersion => Some(Ok(Some(WsMessage::response(
                msg.req_id,
                resp_msg,
                IntegrationVersion {
                    api: API_VERSION.to_string(),
                    integration: APP_VERSION.to_string(),
                },
            )))),
            WsRequest::GetDriverMetadata => Some(Ok(Some(WsMessage::response(
                msg.req_id,
                resp_msg,
                &self.drv_metadata,
            )))),
            WsRequest::GetDeviceState => {
                self.send_device_state(&msg.ws_id);
                Some(Ok(None))
            }
            _ => None,
        };

        if let Some(result) = result {
            return Box::pin(std::future::ready(result));
        }

        // handle setup requests
        match msg.request {
            WsRequest::SetupDriver => {
                let addr = ctx.address();
                let ws_id = msg.ws_id.clone();
                let req_id = msg.req_id;
                return Box::pin(async move {
                    let setup_msg = SetupDriverMsg {
                        ws_id,
                        req_id,
                        data: msg.deserialize()?,
                    };
                    addr.send(setup_msg).await?
                });
            }
            WsRequest::SetDriverUserData => {
                let addr = ctx.address();
                let ws_id = msg.ws_id.clone();
                let req_id = msg.req_id;
                return Box::pin(async move {
                    let setup_msg = SetDriverUserDataMsg {
                        ws_id,
                        req_id,
                        data: msg.deserialize()?,
                    };
                    addr.send(setup_msg).await?
                });
            }
            _ => {}
        };

        // the remaining requests can only be handled if the driver is in the "running" mode
        if self
            .machine
            .consume(&OperationModeInput::ApiRequest)
            .is_err()
        {
            return Box::pin(std::future::ready(Err(ServiceError::ServiceUnavailable(
                "Request cannot be handled: setup required".into(),
            ))));
        }

        let result = match msg.request {
            WsRequest::GetDriverVersion
            | WsRequest::GetDriverMetadata
            | WsRequest::GetDeviceState
            | WsRequest::SetupDriver
            | WsRequest::SetDriverUserData => {
                panic!(
                    "BUG: client request {} must have been handled by now!",
                    msg.request
                );
            }

            WsRequest::GetAvailableEntities => {
                // refresh the upstream cache, the response is served from the current state
                if let Some(addr) = self.ha_client.as_ref() {
                    addr.do_send(GetStates);
                }
                let msg_data = AvailableEntitiesMsgData {
                    filter: None,
                    available_entities: self.persons.available_entities(),
                };
                Ok(Some(WsMessage::response(msg.req_id, resp_msg, msg_data)))
            }
            WsRequest::GetEntityStates => Ok(Some(WsMessage::response(
                msg.req_id,
                resp_msg,
                self.persons.entity_states(),
            ))),
            WsRequest::SubscribeEvents => {
                let req_id = msg.req_id;
                let ws_id = msg.ws_id.clone();
                match msg.deserialize_or_default::<SubscribeEvents>() {
                    Ok(subscribe) => {
                        if let Some(session) = self.sessions.get_mut(&ws_id) {
                            session.subscribed_entities.extend(subscribe.entity_ids);
                            Ok(Some(WsMessage::response(
                                req_id,
                                resp_msg,
                                WsResultMsgData::ok("Subscribed"),
                            )))
                        } else {
                            Err(ServiceError::NotConnected)
                        }
                    }
                    Err(e) => Err(e.into()),
                }
            }
            WsRequest::UnsubscribeEvents => {
                let req_id = msg.req_id;
                let ws_id = msg.ws_id.clone();
                match msg.deserialize_or_default::<SubscribeEvents>() {
                    Ok(unsubscribe) => {
                        if let Some(session) = self.sessions.get_mut(&ws_id) {
                            for entity_id in unsubscribe.entity_ids {
                                session.subscribed_entities.remove(&entity_id);
                            }
                            Ok(Some(WsMessage::response(
                                req_id,
                                resp_msg,
                                WsResultMsgData::ok("Unsubscribed"),
                            )))
                        } else {
                            Err(ServiceError::NotConnected)
                        }
                    }
                    Err(e) => Err(e.into()),
                }
            }
            WsRequest::EntityCommand => {
                let addr = ctx.address();
                let ws_id = msg.ws_id.clone();
                let req_id = msg.req_id;
                return Box::pin(async move {
                    let command: EntityCommand = msg.deserialize()?;
                    addr.send(EntityCommandMsg {
                        ws_id,
                        req_id,
                        command,
                    })
                    .await?
                });
            }
        };

        Box::pin(std::future::ready(result))
    }
}
