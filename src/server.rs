//! Websocket transport for the accessory bridge.
//!
//! Clients connect to `/accessory`, receive the accessory information and the
//! current characteristic values, then every characteristic update as it is
//! published. Writes to the target position and identify requests travel the
//! other way as JSON text frames.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt, TryFutureExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};
use warp::filters::ws::{Message, WebSocket};
use warp::Filter;

use crate::api::{Characteristic, Notification, Value};
use crate::bridge::{AccessoryInfo, Handler, Hub, Observer, Snapshot};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outgoing<'a> {
    Accessory {
        info: &'a AccessoryInfo,
        characteristics: Snapshot,
    },
    Characteristic {
        characteristic: Characteristic,
        value: u8,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Incoming {
    Write {
        characteristic: Characteristic,
        value: serde_json::Value,
    },
    Identify,
}

pub fn routes(
    handler: Arc<dyn Handler>,
    hub: Arc<Hub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let handler = warp::any().map(move || handler.clone());
    let hub = warp::any().map(move || hub.clone());

    warp::path("accessory")
        .and(warp::ws())
        .and(handler)
        .and(hub)
        .map(|ws: warp::ws::Ws, handler, hub| {
            ws.on_upgrade(move |websocket| connection(websocket, handler, hub))
        })
}

/// Applies one client frame.
pub fn dispatch(text: &str, handler: &dyn Handler, hub: &Hub) -> Result<()> {
    match serde_json::from_str::<Incoming>(text)? {
        Incoming::Write {
            characteristic: Characteristic::TargetPosition,
            value,
        } => {
            // publish before the command is queued so a stop republish lands after it
            let value = Value::from(value);
            let target = value.to_position()?;
            hub.notify(Notification::TargetPosition(target));
            handler.on_target_write(value)?;
            Ok(())
        }
        Incoming::Write { characteristic, .. } => Err(Error::ReadOnly(characteristic.name())),
        Incoming::Identify => {
            info!("bridge: identify");
            handler.identify();
            Ok(())
        }
    }
}

fn encode(frame: &Outgoing) -> Message {
    // serializing these frames cannot fail
    Message::text(serde_json::to_string(frame).unwrap_or_default())
}

async fn connection(websocket: WebSocket, handler: Arc<dyn Handler>, hub: Arc<Hub>) {
    let (mut ws_tx, mut from_client) = websocket.split();
    let (to_client, rx) = mpsc::unbounded_channel();

    info!("bridge client connected");

    let mut rx = UnboundedReceiverStream::new(rx);
    tokio::task::spawn(async move {
        while let Some(message) = rx.next().await {
            ws_tx
                .send(message)
                .unwrap_or_else(|e| {
                    warn!("websocket send error: {}", e);
                })
                .await;
        }
    });

    let updates = BroadcastStream::new(hub.subscribe());
    let _ = to_client.send(encode(&Outgoing::Accessory {
        info: hub.info(),
        characteristics: hub.snapshot(),
    }));
    let forward = tokio::task::spawn(forward(updates, hub.clone(), to_client.clone()));

    while let Some(result) = from_client.next().await {
        match result {
            Ok(msg) if msg.is_text() => {
                let text = msg.to_str().unwrap_or_default();
                debug!("bridge rx: {}", text);
                if let Err(e) = dispatch(text, handler.as_ref(), &hub) {
                    warn!("bridge request rejected: {}", e);
                    let _ = to_client.send(encode(&Outgoing::Error {
                        message: e.to_string(),
                    }));
                }
            }
            Ok(msg) if msg.is_close() => break,
            Err(e) => {
                warn!("websocket error: {}", e);
                break;
            }
            _ => debug!("unsupported message type"),
        };
    }

    forward.abort();
    info!("bridge client disconnected")
}

async fn forward(
    mut updates: BroadcastStream<Notification>,
    hub: Arc<Hub>,
    to_client: UnboundedSender<Message>,
) {
    while let Some(update) = updates.next().await {
        match update {
            Ok(notification) => {
                let frame = Outgoing::Characteristic {
                    characteristic: notification.characteristic(),
                    value: hub.encode(notification),
                };
                if to_client.send(encode(&frame)).is_err() {
                    break;
                }
            }
            Err(e) => warn!("bridge client lagging: {}", e),
        }
    }
}
