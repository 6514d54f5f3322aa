// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

use crate::configuration::ENV_API_MSG_TRACING;
use crate::controller::{ApiSessionDisconnect, NewApiSession, SendWsMessage};
use crate::server::ws::{api_messages, WsConn};
use crate::util::tracing_from_env;
use crate::Controller;

use actix::{
    fut, Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, ContextFutureSpawner, Handler,
    Running, StreamHandler, WrapFuture,
};
use actix_web_actors::ws::{CloseCode, CloseReason, Message, ProtocolError, WebsocketContext};
use bytestring::ByteString;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

impl Actor for WsConn {
    type Context = WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.start_heartbeat(ctx);
        // register new WebSocket connection to our handler
        self.controller_addr
            .send(NewApiSession {
                addr: ctx.address().recipient(),
                id: self.id.clone(),
            })
            .into_actor(self)
            .then(|res, _, ctx| {
                match res {
                    Ok(_res) => (),
                    _ => ctx.stop(),
                }
                fut::ready(())
            })
            .wait(ctx);

        debug!("[{}] session started", self.id);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // remove WebSocket connection from our handler
        self.controller_addr.do_send(ApiSessionDisconnect {
            id: self.id.clone(),
        });
        info!("[{}] session stopped", self.id);
        Running::Stop
    }
}

impl StreamHandler<actix_web::Result<Message, ProtocolError>> for WsConn {
    fn handle(&mut self, msg: actix_web::Result<Message, ProtocolError>, ctx: &mut Self::Context) {
        if let Ok(msg) = msg {
            match msg {
                Message::Text(text) => self.on_text_message(text, ctx),
                Message::Binary(_) => {
                    self.close(CloseCode::Size, "Binary messages not supported!", ctx);
                }
                Message::Ping(bytes) => {
                    self.hb = Instant::now();
                    ctx.pong(&bytes);
                }
                Message::Pong(_) => self.hb = Instant::now(),
                Message::Close(reason) => {
                    ctx.close(reason);
                    ctx.stop();
                }
                Message::Continuation(_) => {
                    self.close(CloseCode::Size, "Continuation frames not supported!", ctx);
                }
                Message::Nop => {}
            }
        } else {
            info!("Closing WebSocket: {:?}", msg.unwrap_err());
            ctx.stop();
        }
    }
}

impl Handler<SendWsMessage> for WsConn {
    type Result = ();

    fn handle(&mut self, msg: SendWsMessage, ctx: &mut Self::Context) {
        if let Ok(msg) = serde_json::to_string(&msg.0) {
            if self.msg_tracing {
                debug!("[{}] <- {msg}", self.id);
            }
            ctx.text(msg);
        } else {
            error!("[{}] Error serializing {:?}", self.id, msg.0)
        }
    }
}

impl WsConn {
    pub(crate) fn new(client_id: String, controller_addr: Addr<Controller>) -> Self {
        Self {
            id: client_id,
            hb: Instant::now(),
            controller_addr,
            msg_tracing: tracing_from_env(ENV_API_MSG_TRACING),
        }
    }

    fn start_heartbeat(&self, ctx: &mut WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                info!("[{}] Closing connection due to failed heartbeat", act.id);
                // remove WebSocket connection from our handler
                act.controller_addr
                    .do_send(ApiSessionDisconnect { id: act.id.clone() });

                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    fn close(&mut self, code: CloseCode, description: &str, ctx: &mut WebsocketContext<WsConn>) {
        info!("[{}] Closing connection with code {code:?}: {description}", self.id);
        ctx.close(Some(CloseReason {
            code,
            description: Some(description.into()),
        }));
        ctx.stop();
    }

    pub(crate) fn send_error(
        &self,
        req_id: u32,
        code: u16,
        error_code: &str,
        message: String,
        ctx: &mut WebsocketContext<WsConn>,
    ) {
        let data = api_messages::WsError {
            code: error_code.into(),
            message,
        };
        let response = api_messages::WsMessage::error(req_id, code, data);
        if let Ok(msg) = serde_json::to_string(&response) {
            ctx.text(msg);
        }
    }

    pub(crate) fn send_missing_field_error(
        &self,
        req_id: u32,
        field: &str,
        ctx: &mut WebsocketContext<WsConn>,
    ) {
        let response = api_messages::WsMessage::missing_field(req_id, field);
        if let Ok(msg) = serde_json::to_string(&response) {
            ctx.text(msg);
        }
    }

    fn on_text_message(&mut self, text: ByteString, ctx: &mut WebsocketContext<WsConn>) {
        if self.msg_tracing {
            debug!("[{}] -> {text}", self.id);
        }
        let msg: api_messages::WsMessage = match serde_json::from_slice(text.as_bytes()) {
            Ok(v) => v,
            Err(e) => {
                warn!("[{}] Invalid JSON message: {e}", self.id);
                self.close(CloseCode::Unsupported, "Invalid JSON message", ctx);
                return;
            }
        };

        match msg.kind {
            None => {
                warn!(
                    "[{}] Expected json object payload with 'kind' key, but got: {text:?}",
                    self.id
                );
                self.send_missing_field_error(0, "kind", ctx);
            }
            Some(ref k) => match k.as_str() {
                "req" => self.on_request(msg, ctx),
                "resp" => self.on_response(msg, ctx),
                "event" => self.on_event(msg, ctx),
                _ => {
                    warn!("[{}] Unsupported client message kind: {k}", self.id);
                    self.send_error(0, 400, "BAD_REQUEST", format!("Invalid kind value: {k}"), ctx);
                }
            },
        }
    }
}
