//! Time-bounded celebration animation.
//!
//! A frame timer samples the clock, turns elapsed time into a completion
//! fraction against a fixed duration and moves the element from just below
//! the screen to just above it. The loop stops itself once the duration has
//! passed.

use crate::timer::TimerState;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Screen and element geometry, in the same distance unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub screen_width: f64,
    pub screen_height: f64,
    pub element_size: f64,
}

impl Stage {
    /// Travel reference: the screen height plus one element.
    pub fn height(&self) -> f64 {
        self.screen_height + self.element_size
    }

    pub fn start_position(&self) -> Position {
        Position {
            x: self.screen_width / 2.0,
            y: self.height() + self.element_size / 2.0,
        }
    }

    pub fn y_at(&self, fraction: f64) -> f64 {
        let height = self.height();
        height - (height + self.element_size / 2.0) * fraction
    }
}

/// Receives the animated element's updates.
pub trait PositionSink {
    fn publish_position(&mut self, position: Position);
    fn set_visible(&mut self, visible: bool);
}

/// Horizontal wobble applied on every frame.
pub trait JitterSource {
    fn sample(&mut self) -> f64;
}

pub struct RandomJitter {
    amplitude: f64,
}

impl RandomJitter {
    pub fn new(amplitude: f64) -> Self {
        Self {
            amplitude: amplitude.abs(),
        }
    }
}

impl JitterSource for RandomJitter {
    fn sample(&mut self) -> f64 {
        if self.amplitude == 0.0 {
            return 0.0;
        }
        rand::thread_rng().gen_range(-self.amplitude..=self.amplitude)
    }
}

/// Always returns the same offset.
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// The animated element as last published.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Balloon {
    pub position: Option<Position>,
    pub visible: bool,
}

impl PositionSink for Balloon {
    fn publish_position(&mut self, position: Position) {
        self.position = Some(position);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// A `Balloon` that outlives its owner; clones observe the same element.
#[derive(Debug, Clone, Default)]
pub struct SharedBalloon(Rc<RefCell<Balloon>>);

impl SharedBalloon {
    pub fn snapshot(&self) -> Balloon {
        *self.0.borrow()
    }
}

impl PositionSink for SharedBalloon {
    fn publish_position(&mut self, position: Position) {
        self.0.borrow_mut().publish_position(position);
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().set_visible(visible);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub current: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationTick {
    Idle,
    Moved { position: Position, fraction: f64 },
    Finished,
}

#[derive(Debug, Clone)]
pub struct AnimationLoop {
    duration: Duration,
    frame_period: Duration,
    timer: TimerState,
    state: Option<AnimationState>,
}

impl AnimationLoop {
    pub fn new(duration: Duration, frame_period: Duration) -> Self {
        Self {
            duration: duration.max(Duration::from_nanos(1)),
            frame_period,
            timer: TimerState::Idle,
            state: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&AnimationState> {
        self.state.as_ref()
    }

    pub fn next_fire(&self) -> Option<SystemTime> {
        self.timer.next_fire()
    }

    pub fn latest_fire(&self) -> Option<SystemTime> {
        self.timer.latest_fire()
    }

    /// Starts from the off-screen position. A trigger while running restarts
    /// the animation from `now`; returns true in that case.
    pub fn trigger(&mut self, now: SystemTime, stage: &Stage, sink: &mut dyn PositionSink) -> bool {
        let restarted = self.is_running();
        let start = stage.start_position();
        self.state = Some(AnimationState {
            start_time: now,
            end_time: now + self.duration,
            current: start,
        });
        sink.publish_position(start);
        sink.set_visible(true);
        self.timer.restart(now, self.frame_period, Duration::ZERO);
        restarted
    }

    /// Returns true when a running animation was cancelled.
    pub fn cancel(&mut self, sink: &mut dyn PositionSink) -> bool {
        self.timer.stop();
        if self.state.take().is_none() {
            return false;
        }
        sink.set_visible(false);
        true
    }

    pub fn poll(
        &mut self,
        now: SystemTime,
        stage: &Stage,
        jitter: &mut dyn JitterSource,
        sink: &mut dyn PositionSink,
    ) -> AnimationTick {
        let Some(state) = self.state else {
            return AnimationTick::Idle;
        };
        if !self.timer.fire_if_due(now) {
            return AnimationTick::Idle;
        }

        // Terminate before computing this frame so nothing overshoots.
        if now >= state.end_time {
            self.timer.stop();
            self.state = None;
            sink.set_visible(false);
            return AnimationTick::Finished;
        }

        let elapsed = now
            .duration_since(state.start_time)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        let fraction = (elapsed / self.duration.as_secs_f64()).clamp(0.0, 1.0);
        let position = Position {
            x: state.current.x + jitter.sample(),
            y: stage.y_at(fraction),
        };
        self.state = Some(AnimationState {
            current: position,
            ..state
        });
        sink.publish_position(position);
        AnimationTick::Moved { position, fraction }
    }
}
