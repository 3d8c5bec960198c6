//! Controller for a relay-driven window-covering motor.
//!
//! A single task owns the motor state machine and advances the position on a
//! fixed cadence. Target-position writes from the accessory bridge and button
//! presses reach it through a lossy single-slot channel.

pub mod api;
pub mod bridge;
pub mod button;
pub mod cli;
pub mod config;
pub mod error;
pub mod gpio;
pub mod led;
pub mod motor;
pub mod server;
pub mod window;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
