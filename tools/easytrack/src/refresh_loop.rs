use crate::task_registry::TaskId;
use crate::timer::TimerState;
use std::time::{Duration, SystemTime};

/// Answers which list entries are currently on screen.
pub trait VisibleItemsProvider {
    fn visible_item_ids(&self) -> Vec<TaskId>;
}

impl VisibleItemsProvider for Vec<TaskId> {
    fn visible_item_ids(&self) -> Vec<TaskId> {
        self.clone()
    }
}

/// One shared repeating timer that refreshes the elapsed time of visible rows.
#[derive(Debug, Clone)]
pub struct RefreshLoop {
    state: TimerState,
    period: Duration,
    tolerance: Duration,
}

impl RefreshLoop {
    pub fn new(period: Duration, tolerance: Duration) -> Self {
        Self {
            state: TimerState::Idle,
            period,
            tolerance,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Returns true only for the call that actually started the timer.
    pub fn start(&mut self, now: SystemTime) -> bool {
        self.state.start(now, self.period, self.tolerance)
    }

    pub fn stop(&mut self) -> bool {
        self.state.stop()
    }

    pub fn next_fire(&self) -> Option<SystemTime> {
        self.state.next_fire()
    }

    pub fn latest_fire(&self) -> Option<SystemTime> {
        self.state.latest_fire()
    }

    /// Fires the tick if due and calls `on_tick` once per visible item.
    /// Returns the number of callbacks, or `None` when no tick fired.
    pub fn poll<F>(
        &mut self,
        now: SystemTime,
        provider: &dyn VisibleItemsProvider,
        mut on_tick: F,
    ) -> Option<usize>
    where
        F: FnMut(TaskId),
    {
        if !self.state.fire_if_due(now) {
            return None;
        }
        let visible = provider.visible_item_ids();
        for id in &visible {
            on_tick(*id);
        }
        Some(visible.len())
    }
}
