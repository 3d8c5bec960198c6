use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use git_version::git_version;

use crate::api::StateNumbering;
use crate::bridge::AccessoryInfo;
use crate::config::Config;
use crate::{Error, Result};

pub const GIT_VERSION: &str = git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown");

/// Window-covering motor controller with a websocket accessory bridge.
#[derive(Parser, Debug)]
#[clap(name = "Shutterman", version = GIT_VERSION)]
pub struct Opts {
    #[clap(long, default_value = "127.0.0.1")]
    pub address: IpAddr,

    #[clap(long, default_value = "9000")]
    pub port: u16,

    /// Time for a full 0 to 100 run
    #[clap(long, default_value = "20000")]
    pub travel_time_ms: u64,

    /// Pause after a stop before the target position is republished
    #[clap(long, default_value = "500")]
    pub settle_delay_ms: u64,

    #[clap(long, default_value = "12")]
    pub up_pin: u8,

    #[clap(long, default_value = "4")]
    pub down_pin: u8,

    #[clap(long, default_value = "2")]
    pub led_pin: u8,

    /// Opens fully when idle, stops when moving
    #[clap(long, default_value = "17")]
    pub button_a_pin: u8,

    /// Closes fully when idle, stops when moving
    #[clap(long, default_value = "5")]
    pub button_b_pin: u8,

    #[clap(long, default_value = "4000")]
    pub debounce_us: u64,

    /// Position-state numbering on the wire: hap or legacy
    #[clap(long, default_value = "hap")]
    pub position_state: StateNumbering,

    /// Log pin writes instead of driving the relays
    #[clap(long)]
    pub dry_run: bool,

    #[clap(long, default_value = "Shutter Motor")]
    pub name: String,

    #[clap(long, default_value = "shutterman")]
    pub manufacturer: String,

    #[clap(long, default_value = "000000000001")]
    pub serial_number: String,

    #[clap(long, default_value = "Relay Shutter")]
    pub model: String,

    #[clap(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub firmware_revision: String,
}

impl Opts {
    pub fn accessory_info(&self) -> AccessoryInfo {
        AccessoryInfo {
            name: self.name.clone(),
            manufacturer: self.manufacturer.clone(),
            serial_number: self.serial_number.clone(),
            model: self.model.clone(),
            firmware_revision: self.firmware_revision.clone(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_micros(self.debounce_us)
    }
}

impl TryFrom<&Opts> for Config {
    type Error = Error;

    fn try_from(opts: &Opts) -> Result<Self> {
        Config::new(
            Duration::from_millis(opts.travel_time_ms),
            Duration::from_millis(opts.settle_delay_ms),
            opts.position_state,
        )
    }
}
