use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

use log::info;
use rppal::gpio::{Gpio, OutputPin};

use crate::Result;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => f.write_str("Up"),
            Direction::Down => f.write_str("Down"),
        }
    }
}

/// Output side of the board: two direction relays and the status LED.
///
/// Writes are fire-and-forget and idempotent.
pub trait GpioDriver: Send + Sync {
    fn set_direction(&self, dir: Direction, on: bool);
    fn set_led(&self, on: bool);

    fn stop_all(&self) {
        self.set_direction(Direction::Up, false);
        self.set_direction(Direction::Down, false);
    }
}

/// Relay board wired to the Raspberry Pi header.
pub struct RelayBoard {
    up: Mutex<OutputPin>,
    down: Mutex<OutputPin>,
    led: Mutex<OutputPin>,
}

impl Drop for RelayBoard {
    fn drop(&mut self) {
        info!("dropping relay board, releasing relays");
        self.stop_all();
    }
}

impl RelayBoard {
    pub fn new(up: u8, down: u8, led: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let up = gpio.get(up)?.into_output_low();
        let down = gpio.get(down)?.into_output_low();
        // led is active-low
        let led = gpio.get(led)?.into_output_high();

        Ok(Self {
            up: Mutex::new(up),
            down: Mutex::new(down),
            led: Mutex::new(led),
        })
    }
}

fn write(pin: &Mutex<OutputPin>, high: bool) {
    let mut pin = pin.lock().unwrap_or_else(PoisonError::into_inner);
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl GpioDriver for RelayBoard {
    fn set_direction(&self, dir: Direction, on: bool) {
        match dir {
            Direction::Up => write(&self.up, on),
            Direction::Down => write(&self.down, on),
        }
    }

    fn set_led(&self, on: bool) {
        write(&self.led, !on)
    }
}

/// Logs pin writes instead of touching hardware.
#[derive(Default)]
pub struct DryRun;

impl GpioDriver for DryRun {
    fn set_direction(&self, dir: Direction, on: bool) {
        info!("[dry-run] relay {} {}", dir, if on { "on" } else { "off" });
    }

    fn set_led(&self, on: bool) {
        info!("[dry-run] led {}", if on { "on" } else { "off" });
    }
}
