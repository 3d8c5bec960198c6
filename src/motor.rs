use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::api::{ButtonId, Command, MotionState, Notification, POSITION_MAX, POSITION_MIN};
use crate::bridge::Observer;
use crate::gpio::{Direction, GpioDriver};

/// Current and target position shared between the motor task and its producers.
///
/// Only the motor task writes `current`. `target` is written by producers and by
/// the motor task when it reconciles a stop; the last write wins.
#[derive(Debug, Default)]
pub struct Positions {
    current: AtomicU8,
    target: AtomicU8,
}

impl Positions {
    pub fn current(&self) -> u8 {
        self.current.load(Ordering::Acquire)
    }

    pub fn target(&self) -> u8 {
        self.target.load(Ordering::Acquire)
    }

    /// Records a new target and returns the command that moves toward it.
    pub fn request(&self, target: u8) -> Option<Command> {
        let target = target.min(POSITION_MAX);
        self.target.store(target, Ordering::Release);
        Command::toward(self.current(), target)
    }

    fn set_current(&self, position: u8) {
        self.current.store(position, Ordering::Release);
    }

    fn set_target(&self, position: u8) {
        self.target.store(position, Ordering::Release);
    }
}

/// What a command or tick did to the motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Started(MotionState),
    /// Motion was cancelled, or the stepper stopped short of an unreachable
    /// target. The target was reset to `at` and still has to be republished
    /// once the motor has settled.
    Stopped { at: u8 },
    Stepped(u8),
    Arrived(u8),
}

/// Position-control state machine.
pub struct Motor {
    gpio: Arc<dyn GpioDriver>,
    observer: Arc<dyn Observer>,
    positions: Arc<Positions>,
    state: MotionState,
}

impl Motor {
    pub fn new(
        gpio: Arc<dyn GpioDriver>,
        observer: Arc<dyn Observer>,
        positions: Arc<Positions>,
    ) -> Self {
        gpio.stop_all();
        gpio.set_led(false);
        Motor {
            gpio,
            observer,
            positions,
            state: MotionState::Idle,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn position(&self) -> u8 {
        self.positions.current()
    }

    pub fn target(&self) -> u8 {
        self.positions.target()
    }

    pub fn handle(&mut self, cmd: Command) -> Transition {
        use MotionState::*;

        match (self.state, cmd) {
            (_, Command::Idle) => {
                debug!("command Idle received");
                Transition::Unchanged
            }
            (Idle, Command::Open) if self.position() < self.target() => self.start(Direction::Up),
            (Idle, Command::Close) if self.position() > self.target() => {
                self.start(Direction::Down)
            }
            (Idle, cmd) => {
                debug!(
                    "{:?} ignored, position {} already satisfies target {}",
                    cmd,
                    self.position(),
                    self.target()
                );
                Transition::Unchanged
            }
            (Opening, Command::Open) | (Closing, Command::Close) => Transition::Unchanged,
            (Opening, Command::Close) | (Closing, Command::Open) => self.stop(),
        }
    }

    /// A debounced button press: a shortcut to fully open/closed while idle,
    /// an immediate stop while moving.
    pub fn press(&mut self, button: ButtonId) -> Transition {
        match self.state {
            MotionState::Idle => {
                let target = button.target();
                info!("button {:?}: setting target position to {}", button, target);
                let cmd = self.positions.request(target);
                self.observer.notify(Notification::TargetPosition(target));
                match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => Transition::Unchanged,
                }
            }
            _ => {
                info!("button {:?}: stopping", button);
                self.stop()
            }
        }
    }

    /// Advances one position step. Called once per step period in every state.
    pub fn step(&mut self) -> Transition {
        let dir = match self.state {
            MotionState::Idle => return Transition::Unchanged,
            MotionState::Opening => Direction::Up,
            MotionState::Closing => Direction::Down,
        };

        let position = match dir {
            Direction::Up => self.position().saturating_add(1).min(POSITION_MAX),
            Direction::Down => self.position().saturating_sub(1).max(POSITION_MIN),
        };
        self.positions.set_current(position);
        self.observer.notify(Notification::CurrentPosition(position));
        debug!("current position: {}", position);

        let target = self.target();
        if !target_is_met(position, target, dir) {
            return Transition::Stepped(position);
        }

        self.gpio.set_direction(dir, false);
        self.observer
            .notify(Notification::PositionState(MotionState::Idle));
        self.state = MotionState::Idle;
        if position != target {
            // passed a target rewritten behind us, or hit an end stop
            info!("stopped at {}, target {} not reachable", position, target);
            self.positions.set_target(position);
            return Transition::Stopped { at: position };
        }
        info!("arrived at {}", position);
        Transition::Arrived(position)
    }

    /// Deasserts both relays and leaves the motor idle where it stands.
    pub fn stop(&mut self) -> Transition {
        if self.state == MotionState::Idle {
            return Transition::Unchanged;
        }

        let position = self.position();
        self.gpio.stop_all();
        self.positions.set_target(position);
        self.observer
            .notify(Notification::CurrentPosition(position));
        self.observer
            .notify(Notification::PositionState(MotionState::Idle));
        info!("{} => Idle at {}", self.state, position);
        self.state = MotionState::Idle;
        Transition::Stopped { at: position }
    }

    fn start(&mut self, dir: Direction) -> Transition {
        let state = match dir {
            Direction::Up => MotionState::Opening,
            Direction::Down => MotionState::Closing,
        };
        info!(
            "{} => {} ({} -> {})",
            self.state,
            state,
            self.position(),
            self.target()
        );
        self.gpio.set_direction(dir, true);
        self.observer.notify(Notification::PositionState(state));
        self.state = state;
        Transition::Started(state)
    }
}

fn target_is_met(current: u8, target: u8, dir: Direction) -> bool {
    match dir {
        Direction::Up => current >= target || current == POSITION_MAX,
        Direction::Down => current <= target || current == POSITION_MIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingGpio, RecordingObserver};

    struct Rig {
        motor: Motor,
        gpio: Arc<RecordingGpio>,
        observer: Arc<RecordingObserver>,
        positions: Arc<Positions>,
    }

    fn rig() -> Rig {
        let gpio = Arc::new(RecordingGpio::default());
        let observer = Arc::new(RecordingObserver::default());
        let positions = Arc::new(Positions::default());
        let motor = Motor::new(gpio.clone(), observer.clone(), positions.clone());
        gpio.clear();
        Rig {
            motor,
            gpio,
            observer,
            positions,
        }
    }

    impl Rig {
        fn request(&mut self, target: u8) -> Transition {
            match self.positions.request(target) {
                Some(cmd) => self.motor.handle(cmd),
                None => Transition::Unchanged,
            }
        }

        fn step_until_idle(&mut self) -> usize {
            let mut ticks = 0;
            while self.motor.state() != MotionState::Idle {
                self.motor.step();
                ticks += 1;
                assert!(ticks <= 200, "motor never arrived");
            }
            ticks
        }
    }

    #[test]
    fn new_motor_releases_outputs() {
        let gpio = Arc::new(RecordingGpio::default());
        let observer = Arc::new(RecordingObserver::default());
        let motor = Motor::new(gpio.clone(), observer, Arc::new(Positions::default()));

        assert_eq!(motor.state(), MotionState::Idle);
        assert_eq!((motor.position(), motor.target()), (0, 0));
        assert!(!gpio.is_on(Direction::Up));
        assert!(!gpio.is_on(Direction::Down));
        assert_eq!(gpio.led(), Some(false));
    }

    #[test]
    fn open_from_idle_starts_up_relay() {
        let mut rig = rig();
        assert_eq!(rig.request(100), Transition::Started(MotionState::Opening));

        assert!(rig.gpio.is_on(Direction::Up));
        assert!(!rig.gpio.is_on(Direction::Down));
        assert_eq!(
            rig.observer.take(),
            vec![Notification::PositionState(MotionState::Opening)]
        );
    }

    #[test]
    fn close_from_idle_starts_down_relay() {
        let mut rig = rig();
        rig.request(30);
        rig.step_until_idle();
        rig.gpio.clear();
        rig.observer.take();

        assert_eq!(rig.request(10), Transition::Started(MotionState::Closing));
        assert!(rig.gpio.is_on(Direction::Down));
        assert_eq!(
            rig.observer.take(),
            vec![Notification::PositionState(MotionState::Closing)]
        );
    }

    #[test]
    fn repeated_command_in_same_direction_is_coalesced() {
        let mut rig = rig();
        rig.request(100);
        rig.gpio.clear();
        rig.observer.take();

        assert_eq!(rig.motor.handle(Command::Open), Transition::Unchanged);
        assert_eq!(rig.motor.state(), MotionState::Opening);
        assert!(rig.gpio.writes().is_empty());
        assert!(rig.observer.take().is_empty());
    }

    #[test]
    fn idle_command_is_a_no_op_in_every_state() {
        let mut rig = rig();
        assert_eq!(rig.motor.handle(Command::Idle), Transition::Unchanged);
        rig.request(50);
        rig.observer.take();
        assert_eq!(rig.motor.handle(Command::Idle), Transition::Unchanged);
        assert_eq!(rig.motor.state(), MotionState::Opening);
        assert!(rig.observer.take().is_empty());
    }

    #[test]
    fn opposite_command_stops_instead_of_reversing() {
        let mut rig = rig();
        rig.request(100);
        for _ in 0..40 {
            rig.motor.step();
        }
        rig.observer.take();

        assert_eq!(rig.motor.handle(Command::Close), Transition::Stopped { at: 40 });
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert!(!rig.gpio.is_on(Direction::Up));
        assert!(!rig.gpio.is_on(Direction::Down));
        assert_eq!(rig.motor.target(), 40);
        assert_eq!(
            rig.observer.take(),
            vec![
                Notification::CurrentPosition(40),
                Notification::PositionState(MotionState::Idle),
            ]
        );
    }

    #[test]
    fn closing_stopped_by_open() {
        let mut rig = rig();
        rig.request(100);
        rig.step_until_idle();
        rig.request(0);
        for _ in 0..25 {
            rig.motor.step();
        }

        assert_eq!(rig.motor.handle(Command::Open), Transition::Stopped { at: 75 });
        assert!(!rig.gpio.is_on(Direction::Down));
        assert_eq!(rig.motor.target(), 75);
    }

    #[test]
    fn repeated_close_while_closing_is_coalesced() {
        let mut rig = rig();
        rig.request(100);
        rig.step_until_idle();
        rig.request(0);
        for _ in 0..10 {
            rig.motor.step();
        }
        rig.gpio.clear();
        rig.observer.take();

        assert_eq!(rig.motor.handle(Command::Close), Transition::Unchanged);
        assert_eq!(rig.motor.state(), MotionState::Closing);
        assert!(rig.gpio.is_on(Direction::Down));
        assert!(rig.gpio.writes().is_empty());
        assert!(rig.observer.take().is_empty());

        rig.motor.step();
        assert_eq!(rig.motor.position(), 89);
    }

    #[test]
    fn stale_close_is_ignored() {
        let mut rig = rig();
        rig.request(50);
        rig.step_until_idle();
        rig.positions.request(10);
        rig.positions.request(70);
        rig.gpio.clear();
        rig.observer.take();

        assert_eq!(rig.motor.handle(Command::Close), Transition::Unchanged);
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert!(rig.gpio.writes().is_empty());
        assert!(rig.observer.take().is_empty());

        // equal position and target is stale as well
        rig.positions.request(50);
        assert_eq!(rig.motor.handle(Command::Close), Transition::Unchanged);
        assert!(rig.gpio.writes().is_empty());
    }

    #[test]
    fn stale_open_is_ignored() {
        let mut rig = rig();
        rig.positions.request(100);
        rig.positions.request(0);

        assert_eq!(rig.motor.handle(Command::Open), Transition::Unchanged);
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert!(rig.gpio.writes().is_empty());
    }

    #[test]
    fn stepper_is_idle_when_not_moving() {
        let mut rig = rig();
        assert_eq!(rig.motor.step(), Transition::Unchanged);
        assert_eq!(rig.motor.position(), 0);
        assert!(rig.observer.take().is_empty());
    }

    #[test]
    fn stepper_arrives_in_the_tick_position_meets_target() {
        let mut rig = rig();
        rig.request(3);
        rig.observer.take();

        assert_eq!(rig.motor.step(), Transition::Stepped(1));
        assert_eq!(rig.motor.step(), Transition::Stepped(2));
        assert!(rig.gpio.is_on(Direction::Up));
        assert_eq!(rig.motor.step(), Transition::Arrived(3));
        assert!(!rig.gpio.is_on(Direction::Up));
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert_eq!(
            rig.observer.take(),
            vec![
                Notification::CurrentPosition(1),
                Notification::CurrentPosition(2),
                Notification::CurrentPosition(3),
                Notification::PositionState(MotionState::Idle),
            ]
        );
    }

    #[test]
    fn positions_move_monotonically_and_stay_in_range() {
        let mut rig = rig();
        rig.request(100);
        let mut last = rig.motor.position();
        while rig.motor.state() == MotionState::Opening {
            rig.motor.step();
            assert!(rig.motor.position() > last);
            last = rig.motor.position();
        }
        assert_eq!(last, 100);

        rig.request(0);
        while rig.motor.state() == MotionState::Closing {
            rig.motor.step();
            assert!(rig.motor.position() < last);
            last = rig.motor.position();
        }
        assert_eq!(last, 0);

        // further ticks never wrap
        for _ in 0..5 {
            rig.motor.step();
        }
        assert_eq!(rig.motor.position(), 0);
    }

    #[test]
    fn target_rewritten_behind_the_motor_stops_at_next_step() {
        let mut rig = rig();
        rig.request(100);
        for _ in 0..50 {
            rig.motor.step();
        }
        // a new target landed but its Close command was dropped
        rig.positions.request(20);
        rig.observer.take();

        assert_eq!(rig.motor.step(), Transition::Stopped { at: 51 });
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert!(!rig.gpio.is_on(Direction::Up));
        assert_eq!(rig.motor.target(), 51);
        // the target is republished by the owner after the settle delay
        assert_eq!(
            rig.observer.take(),
            vec![
                Notification::CurrentPosition(51),
                Notification::PositionState(MotionState::Idle),
            ]
        );
    }

    #[test]
    fn full_travel_takes_one_hundred_steps() {
        let mut rig = rig();
        rig.request(100);
        assert_eq!(rig.step_until_idle(), 100);
        assert_eq!(rig.motor.position(), 100);
        assert!(!rig.gpio.is_on(Direction::Up));
    }

    #[test]
    fn button_shortcuts_when_idle() {
        let mut rig = rig();
        assert_eq!(
            rig.motor.press(ButtonId::A),
            Transition::Started(MotionState::Opening)
        );
        assert_eq!(rig.motor.target(), 100);
        assert_eq!(
            rig.observer.take(),
            vec![
                Notification::TargetPosition(100),
                Notification::PositionState(MotionState::Opening),
            ]
        );
    }

    #[test]
    fn button_b_at_closed_position_does_nothing() {
        let mut rig = rig();
        assert_eq!(rig.motor.press(ButtonId::B), Transition::Unchanged);
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert!(rig.gpio.writes().is_empty());
    }

    #[test]
    fn any_button_stops_motion() {
        let mut rig = rig();
        rig.request(100);
        for _ in 0..40 {
            rig.motor.step();
        }

        // same direction button still stops
        assert_eq!(rig.motor.press(ButtonId::A), Transition::Stopped { at: 40 });
        assert_eq!(rig.motor.state(), MotionState::Idle);
        assert!(!rig.gpio.is_on(Direction::Up));
        assert_eq!(rig.motor.position(), 40);
        assert_eq!(rig.motor.target(), 40);
    }
}
