use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use shutterman::api::Notification;
use shutterman::bridge::Observer;
use shutterman::config::Config;
use shutterman::gpio::{Direction, GpioDriver};
use shutterman::motor::Motor;
use shutterman::window::WindowRef;

#[derive(Default)]
pub struct Relays {
    up: Mutex<bool>,
    down: Mutex<bool>,
    toggles: Mutex<usize>,
}

impl Relays {
    pub fn is_on(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => *self.up.lock().unwrap(),
            Direction::Down => *self.down.lock().unwrap(),
        }
    }

    /// Number of relay writes that actually changed a relay.
    pub fn toggles(&self) -> usize {
        *self.toggles.lock().unwrap()
    }
}

impl GpioDriver for Relays {
    fn set_direction(&self, dir: Direction, on: bool) {
        let mut relay = match dir {
            Direction::Up => self.up.lock().unwrap(),
            Direction::Down => self.down.lock().unwrap(),
        };
        if *relay != on {
            *self.toggles.lock().unwrap() += 1;
        }
        *relay = on;
    }

    fn set_led(&self, _on: bool) {}
}

#[derive(Default)]
pub struct Notifications(Mutex<Vec<Notification>>);

impl Notifications {
    pub fn all(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }
}

impl Observer for Notifications {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

pub struct Rig {
    pub window: WindowRef,
    pub task: JoinHandle<Motor>,
    pub relays: Arc<Relays>,
    pub notifications: Arc<Notifications>,
}

pub fn rig() -> Rig {
    let relays = Arc::new(Relays::default());
    let notifications = Arc::new(Notifications::default());
    let (window, task) = WindowRef::new(&Config::default(), relays.clone(), notifications.clone());
    Rig {
        window,
        task,
        relays,
        notifications,
    }
}
