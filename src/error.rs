use core::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

/// An Error that can occur in this crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    GpioError(#[from] rppal::gpio::Error),

    #[error("Invalid target position format: {0}")]
    InvalidTargetFormat(String),

    #[error("Target position {0} is outside 0..=100")]
    TargetOutOfRange(i128),

    #[error("Characteristic {0} is read-only")]
    ReadOnly(&'static str),

    #[error("Malformed bridge frame: {0}")]
    FrameError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
