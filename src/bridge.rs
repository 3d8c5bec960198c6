//! Accessory bridge seams.
//!
//! The controller pushes characteristic updates through an [`Observer`] and the
//! bridge delivers external requests through a [`Handler`]. [`Hub`] is the
//! observer used by the websocket server: it remembers the last published value
//! of each characteristic and fans notifications out to every subscriber.

use std::sync::{Mutex, PoisonError};

use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::api::{MotionState, Notification, StateNumbering, Value};
use crate::Result;

/// Receives characteristic updates from the controller. Must not block.
pub trait Observer: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Requests delivered by the bridge into the controller. Must not block.
pub trait Handler: Send + Sync {
    /// An external write to the target-position characteristic. Returns the
    /// accepted target.
    fn on_target_write(&self, value: Value) -> Result<u8>;

    fn identify(&self);
}

/// Static accessory-information fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessoryInfo {
    pub name: String,
    pub manufacturer: String,
    pub serial_number: String,
    pub model: String,
    pub firmware_revision: String,
}

/// Last published value of each characteristic, encoded for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub current_position: u8,
    pub target_position: u8,
    pub position_state: u8,
}

pub struct Hub {
    info: AccessoryInfo,
    numbering: StateNumbering,
    tx: broadcast::Sender<Notification>,
    last: Mutex<(u8, u8, MotionState)>,
}

impl Hub {
    pub fn new(info: AccessoryInfo, numbering: StateNumbering) -> Self {
        let (tx, _) = broadcast::channel(64);
        Hub {
            info,
            numbering,
            tx,
            last: Mutex::new((0, 0, MotionState::Idle)),
        }
    }

    pub fn info(&self) -> &AccessoryInfo {
        &self.info
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        let (current, target, state) = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            current_position: current,
            target_position: target,
            position_state: self.numbering.encode(state),
        }
    }

    /// Wire value of a notification.
    pub fn encode(&self, notification: Notification) -> u8 {
        match notification {
            Notification::CurrentPosition(p) | Notification::TargetPosition(p) => p,
            Notification::PositionState(s) => self.numbering.encode(s),
        }
    }
}

impl Observer for Hub {
    fn notify(&self, notification: Notification) {
        {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            match notification {
                Notification::CurrentPosition(p) => last.0 = p,
                Notification::TargetPosition(p) => last.1 = p,
                Notification::PositionState(s) => last.2 = s,
            }
        }
        // no subscribers is fine
        if self.tx.send(notification).is_err() {
            debug!("no bridge clients for {:?}", notification);
        }
    }
}
