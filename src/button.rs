use std::time::{Duration, Instant};

use log::{debug, info};
use rppal::gpio::{Gpio, InputPin, Level, Trigger};

use crate::api::ButtonId;
use crate::window::WindowRef;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

/// Filters raw edges of one button into clean press/release events.
///
/// An edge is accepted when it changes the stable level and at least `window`
/// has passed since the last accepted edge.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pressed: bool,
    last_edge: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            pressed: false,
            last_edge: None,
        }
    }

    pub fn edge(&mut self, pressed: bool, at: Instant) -> Option<ButtonEvent> {
        if pressed == self.pressed {
            return None;
        }
        if let Some(last) = self.last_edge {
            if at.saturating_duration_since(last) < self.window {
                return None;
            }
        }

        self.pressed = pressed;
        self.last_edge = Some(at);
        Some(if pressed {
            ButtonEvent::Pressed
        } else {
            ButtonEvent::Released
        })
    }
}

/// Both front-panel buttons, active-low with pull-ups. Interrupts stay armed
/// while this is alive.
pub struct Buttons {
    _pins: Vec<InputPin>,
}

impl Buttons {
    pub fn attach(pins: &[(ButtonId, u8)], window: Duration, target: WindowRef) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut armed = Vec::with_capacity(pins.len());

        for &(id, number) in pins {
            let mut pin = gpio.get(number)?.into_input_pullup();
            let mut debouncer = Debouncer::new(window);
            let target = target.clone();

            pin.set_async_interrupt(Trigger::Both, move |level: Level| {
                match debouncer.edge(level == Level::Low, Instant::now()) {
                    Some(ButtonEvent::Pressed) => {
                        info!("button {:?} pressed", id);
                        target.press(id);
                    }
                    Some(ButtonEvent::Released) => debug!("button {:?} released", id),
                    None => {}
                }
            })?;
            info!("button {:?} armed on pin {}", id, number);
            armed.push(pin);
        }

        Ok(Buttons { _pins: armed })
    }
}
