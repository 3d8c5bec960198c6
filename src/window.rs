use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::api::{ButtonId, Command, Notification, Value};
use crate::bridge::{Handler, Observer};
use crate::config::Config;
use crate::gpio::GpioDriver;
use crate::led;
use crate::motor::{Motor, Positions, Transition};
use crate::Result;

/// Messages accepted by the window task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    Press(ButtonId),
}

/// Producer side of the window task.
///
/// The channel holds a single event. Sends never block: when the slot is
/// taken the new event is dropped. Callers may retry by re-issuing the request.
#[derive(Clone)]
pub struct WindowRef {
    sender: mpsc::Sender<Event>,
    positions: Arc<Positions>,
    gpio: Arc<dyn GpioDriver>,
}

impl WindowRef {
    pub fn new(
        config: &Config,
        gpio: Arc<dyn GpioDriver>,
        observer: Arc<dyn Observer>,
    ) -> (Self, JoinHandle<Motor>) {
        let (tx, rx) = mpsc::channel(1);
        let positions = Arc::new(Positions::default());
        let motor = Motor::new(gpio.clone(), observer.clone(), positions.clone());
        let actor = Window::new(rx, motor, observer, config);
        let handle = tokio::spawn(run_window(actor));

        (
            WindowRef {
                sender: tx,
                positions,
                gpio,
            },
            handle,
        )
    }

    pub fn position(&self) -> u8 {
        self.positions.current()
    }

    pub fn target(&self) -> u8 {
        self.positions.target()
    }

    /// Queues a command. Returns false when it was dropped.
    pub fn send(&self, cmd: Command) -> bool {
        self.enqueue(Event::Command(cmd))
    }

    /// Queues a debounced button press. Returns false when it was dropped.
    pub fn press(&self, button: ButtonId) -> bool {
        self.enqueue(Event::Press(button))
    }

    fn enqueue(&self, event: Event) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!("window queue full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!("window task gone, dropping {:?}", event);
                false
            }
        }
    }
}

impl Handler for WindowRef {
    fn on_target_write(&self, value: Value) -> Result<u8> {
        let target = value.to_position().map_err(|e| {
            warn!("rejected target position write: {}", e);
            e
        })?;

        info!("setting target position to {}", target);
        match self.positions.request(target) {
            Some(cmd) => {
                info!("sending {:?}", cmd);
                self.send(cmd);
            }
            None => info!("no need to change position"),
        }
        Ok(target)
    }

    fn identify(&self) {
        tokio::spawn(led::identify(self.gpio.clone()));
    }
}

/// Owns the motor; the only task that changes its motion state or position.
pub struct Window {
    inbox: mpsc::Receiver<Event>,
    motor: Motor,
    observer: Arc<dyn Observer>,
    step: Duration,
    settle_delay: Duration,
    /// Deadline and stop position of a pending target republish.
    settle: Option<(Instant, u8)>,
}

impl Window {
    pub fn new(
        inbox: mpsc::Receiver<Event>,
        motor: Motor,
        observer: Arc<dyn Observer>,
        config: &Config,
    ) -> Self {
        Window {
            inbox,
            motor,
            observer,
            step: config.step_duration(),
            settle_delay: config.settle_delay(),
            settle: None,
        }
    }

    pub fn handle(&mut self, event: Event) {
        let transition = match event {
            Event::Command(cmd) => self.motor.handle(cmd),
            Event::Press(button) => self.motor.press(button),
        };
        self.after(transition);
    }

    pub fn tick(&mut self) {
        let transition = self.motor.step();
        self.after(transition);
    }

    fn after(&mut self, transition: Transition) {
        if let Transition::Stopped { at } = transition {
            self.settle = Some((Instant::now() + self.settle_delay, at));
        }
    }

    fn settled(&mut self) {
        if let Some((_, at)) = self.settle.take() {
            if self.motor.target() == at {
                self.observer.notify(Notification::TargetPosition(at));
            } else {
                debug!("target rewritten while settling, not republishing {}", at);
            }
        }
    }
}

/// Runs until every [`WindowRef`] is dropped, then stops the motor and hands it back.
pub async fn run_window(mut actor: Window) -> Motor {
    // missed ticks resume from now instead of bursting
    let mut ticker = time::interval_at(Instant::now() + actor.step, actor.step);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("window task running, {:?} per step", actor.step);

    loop {
        let settle_at = actor.settle.map(|(at, _)| at);
        tokio::select! {
            _ = ticker.tick() => actor.tick(),
            _ = time::sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                actor.settled();
            }
            message = actor.inbox.recv() => match message {
                Some(event) => {
                    debug!("window rx: {:?}", event);
                    actor.handle(event)
                }
                None => {
                    info!("all window handles dropped, stopping");
                    actor.motor.stop();
                    break;
                }
            }
        }
    }

    actor.motor
}
