use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fully closed.
pub const POSITION_MIN: u8 = 0;
/// Fully open.
pub const POSITION_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Opening,
    Closing,
}

impl Display for MotionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionState::Idle => f.write_str("Idle"),
            MotionState::Opening => f.write_str("Opening"),
            MotionState::Closing => f.write_str("Closing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Null command, accepted and ignored.
    Idle,
    Open,
    Close,
}

impl Command {
    /// The command that moves `current` toward `target`, if any.
    pub fn toward(current: u8, target: u8) -> Option<Command> {
        if target > current {
            Some(Command::Open)
        } else if target < current {
            Some(Command::Close)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonId {
    /// Opens fully when idle.
    A,
    /// Closes fully when idle.
    B,
}

impl ButtonId {
    pub fn target(self) -> u8 {
        match self {
            ButtonId::A => POSITION_MAX,
            ButtonId::B => POSITION_MIN,
        }
    }
}

/// Characteristics published to the accessory bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    CurrentPosition,
    TargetPosition,
    PositionState,
}

impl Characteristic {
    pub fn name(self) -> &'static str {
        match self {
            Characteristic::CurrentPosition => "current_position",
            Characteristic::TargetPosition => "target_position",
            Characteristic::PositionState => "position_state",
        }
    }
}

/// A characteristic update pushed from the controller to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    CurrentPosition(u8),
    TargetPosition(u8),
    PositionState(MotionState),
}

impl Notification {
    pub fn characteristic(&self) -> Characteristic {
        match self {
            Notification::CurrentPosition(_) => Characteristic::CurrentPosition,
            Notification::TargetPosition(_) => Characteristic::TargetPosition,
            Notification::PositionState(_) => Characteristic::PositionState,
        }
    }
}

/// Wire numbering of the position-state characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateNumbering {
    /// HomeKit Accessory Protocol: 0 decreasing, 1 increasing, 2 stopped.
    Hap,
    /// 0 idle, 1 opening, 2 closing.
    Legacy,
}

impl StateNumbering {
    pub fn encode(self, state: MotionState) -> u8 {
        match (self, state) {
            (StateNumbering::Hap, MotionState::Closing) => 0,
            (StateNumbering::Hap, MotionState::Opening) => 1,
            (StateNumbering::Hap, MotionState::Idle) => 2,
            (StateNumbering::Legacy, MotionState::Idle) => 0,
            (StateNumbering::Legacy, MotionState::Opening) => 1,
            (StateNumbering::Legacy, MotionState::Closing) => 2,
        }
    }
}

impl std::str::FromStr for StateNumbering {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hap" => Ok(StateNumbering::Hap),
            "legacy" => Ok(StateNumbering::Legacy),
            unsupported => Err(format!("{} is not a position-state numbering", unsupported)),
        }
    }
}

/// A payload written to a characteristic by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt8(u8),
    UInt(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
}

impl Value {
    /// Accepts integer payloads in 0..=100.
    pub fn to_position(&self) -> Result<u8> {
        let n = match *self {
            Value::UInt8(n) => n as i128,
            Value::UInt(n) => n as i128,
            Value::Int(n) => n as i128,
            ref other => return Err(Error::InvalidTargetFormat(format!("{:?}", other))),
        };
        if (POSITION_MIN as i128..=POSITION_MAX as i128).contains(&n) {
            Ok(n as u8)
        } else {
            Err(Error::TargetOutOfRange(n))
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match (n.as_u64(), n.as_i64()) {
                (Some(u), _) if u <= u8::MAX as u64 => Value::UInt8(u as u8),
                (Some(u), _) => Value::UInt(u),
                (_, Some(i)) => Value::Int(i),
                _ => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }
    }
}
