use std::sync::Mutex;

use crate::api::Notification;
use crate::bridge::Observer;
use crate::gpio::{Direction, GpioDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Relay(Direction, bool),
    Led(bool),
}

#[derive(Default)]
pub struct RecordingGpio {
    writes: Mutex<Vec<Write>>,
    up: Mutex<bool>,
    down: Mutex<bool>,
}

impl RecordingGpio {
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }

    pub fn is_on(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => *self.up.lock().unwrap(),
            Direction::Down => *self.down.lock().unwrap(),
        }
    }

    pub fn led(&self) -> Option<bool> {
        self.writes().iter().rev().find_map(|w| match w {
            Write::Led(on) => Some(*on),
            _ => None,
        })
    }
}

impl GpioDriver for RecordingGpio {
    fn set_direction(&self, dir: Direction, on: bool) {
        match dir {
            Direction::Up => *self.up.lock().unwrap() = on,
            Direction::Down => *self.down.lock().unwrap() = on,
        }
        self.writes.lock().unwrap().push(Write::Relay(dir, on));
    }

    fn set_led(&self, on: bool) {
        self.writes.lock().unwrap().push(Write::Led(on));
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }

    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}
