use std::time::{Duration, SystemTime};

/// A repeating trigger driven by an external clock.
///
/// The timer never fires early. It may fire up to `tolerance` late so the
/// driver can coalesce it with other wakeups. When several periods have
/// elapsed since the last fire, they collapse into a single tick and the
/// schedule is realigned to the original phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingTimer {
    period: Duration,
    tolerance: Duration,
    next_fire: SystemTime,
}

impl RepeatingTimer {
    pub fn new(now: SystemTime, period: Duration, tolerance: Duration) -> Self {
        let period = period.max(Duration::from_nanos(1));
        Self {
            period,
            tolerance,
            next_fire: now + period,
        }
    }

    pub fn next_fire(&self) -> SystemTime {
        self.next_fire
    }

    pub fn latest_fire(&self) -> SystemTime {
        self.next_fire + self.tolerance
    }

    pub fn is_due(&self, now: SystemTime) -> bool {
        now >= self.next_fire
    }

    /// Returns true when the timer fired at `now`.
    pub fn fire_if_due(&mut self, now: SystemTime) -> bool {
        if !self.is_due(now) {
            return false;
        }
        let behind = now
            .duration_since(self.next_fire)
            .unwrap_or(Duration::ZERO)
            .as_nanos();
        let period = self.period.as_nanos();
        let skipped = (behind / period + 1).saturating_mul(period);
        self.next_fire = u64::try_from(skipped)
            .ok()
            .and_then(|nanos| self.next_fire.checked_add(Duration::from_nanos(nanos)))
            .unwrap_or(now + self.period);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Idle,
    Running(RepeatingTimer),
}

impl TimerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    /// Enters `Running` unless a timer is already active.
    pub fn start(&mut self, now: SystemTime, period: Duration, tolerance: Duration) -> bool {
        if self.is_running() {
            return false;
        }
        *self = Self::Running(RepeatingTimer::new(now, period, tolerance));
        true
    }

    /// Replaces any active timer with a fresh one.
    pub fn restart(&mut self, now: SystemTime, period: Duration, tolerance: Duration) {
        *self = Self::Running(RepeatingTimer::new(now, period, tolerance));
    }

    /// Returns true when a running timer was cancelled.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        *self = Self::Idle;
        was_running
    }

    pub fn fire_if_due(&mut self, now: SystemTime) -> bool {
        match self {
            Self::Idle => false,
            Self::Running(timer) => timer.fire_if_due(now),
        }
    }

    pub fn next_fire(&self) -> Option<SystemTime> {
        match self {
            Self::Idle => None,
            Self::Running(timer) => Some(timer.next_fire()),
        }
    }

    pub fn latest_fire(&self) -> Option<SystemTime> {
        match self {
            Self::Idle => None,
            Self::Running(timer) => Some(timer.latest_fire()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RepeatingTimer, TimerState};
    use std::time::{Duration, SystemTime};

    fn at(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(millis)
    }

    #[test]
    fn fires_once_per_period_and_never_early() {
        let mut timer = RepeatingTimer::new(at(0), Duration::from_secs(1), Duration::ZERO);
        assert!(!timer.fire_if_due(at(999)));
        assert!(timer.fire_if_due(at(1000)));
        assert!(!timer.fire_if_due(at(1000)));
        assert_eq!(timer.next_fire(), at(2000));
    }

    #[test]
    fn missed_periods_coalesce_into_one_tick() {
        let mut timer = RepeatingTimer::new(at(0), Duration::from_secs(1), Duration::ZERO);
        assert!(timer.fire_if_due(at(3500)));
        assert_eq!(timer.next_fire(), at(4000));
        assert!(!timer.fire_if_due(at(3999)));
        assert!(timer.fire_if_due(at(4000)));
        assert_eq!(timer.next_fire(), at(5000));
    }

    #[test]
    fn tiny_period_catches_up_in_one_step() {
        let mut timer = RepeatingTimer::new(at(0), Duration::from_nanos(1), Duration::ZERO);
        assert!(timer.fire_if_due(at(60_000)));
        assert_eq!(
            timer.next_fire(),
            at(60_000) + Duration::from_nanos(1)
        );
    }

    #[test]
    fn tolerance_widens_the_latest_fire_window() {
        let timer = RepeatingTimer::new(
            at(0),
            Duration::from_secs(1),
            Duration::from_millis(100),
        );
        assert_eq!(timer.next_fire(), at(1000));
        assert_eq!(timer.latest_fire(), at(1100));
    }

    #[test]
    fn start_is_idempotent_and_stop_is_safe_when_idle() {
        let mut state = TimerState::default();
        assert!(state.start(at(0), Duration::from_secs(1), Duration::ZERO));
        assert!(!state.start(at(500), Duration::from_secs(1), Duration::ZERO));
        assert_eq!(state.next_fire(), Some(at(1000)));

        assert!(state.stop());
        assert!(!state.stop());
        assert_eq!(state, TimerState::Idle);
        assert!(!state.fire_if_due(at(5000)));
    }
}
