use crate::animation::{
    AnimationLoop, AnimationTick, Balloon, JitterSource, Position, RandomJitter, SharedBalloon,
    Stage,
};
use crate::config::AppConfig;
use crate::errors::TrackerError;
use crate::refresh_loop::{RefreshLoop, VisibleItemsProvider};
use crate::task_registry::{elapsed_label, TaskId, TaskRegistry, TaskStatus};
use crate::viewport::Viewport;
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Add(String),
    /// One-based row number as shown in the list.
    Toggle(usize),
    ScrollDown,
    ScrollUp,
    Celebrate,
    CancelCelebration,
    StartRefresh,
    StopRefresh,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TaskAdded { id: TaskId, name: String },
    TaskToggled { id: TaskId, status: TaskStatus },
    Rejected { reason: String },
    Scrolled { offset: usize },
    RefreshStarted,
    RefreshStopped,
    RefreshTicked { refreshed: Vec<TaskId> },
    CelebrationStarted { restarted: bool },
    BalloonMoved { position: Position, fraction: f64 },
    CelebrationFinished,
    CelebrationCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything one task list screen owns for its lifetime.
///
/// Both timers belong to the session and are released by `shutdown`, which
/// also runs on drop.
pub struct TrackerSession {
    registry: TaskRegistry,
    viewport: Viewport,
    refresh: RefreshLoop,
    animation: AnimationLoop,
    balloon: SharedBalloon,
    stage: Stage,
    jitter: Box<dyn JitterSource>,
    labels: HashMap<TaskId, String>,
    events: Vec<SessionEvent>,
}

impl TrackerSession {
    pub fn new(cfg: &AppConfig, stage: Stage, jitter: Box<dyn JitterSource>) -> Self {
        Self {
            registry: TaskRegistry::new(),
            viewport: Viewport::new(usize::from(cfg.screen.rows)),
            refresh: RefreshLoop::new(cfg.refresh.period(), cfg.refresh.tolerance()),
            animation: AnimationLoop::new(cfg.animation.duration(), cfg.animation.frame_period()),
            balloon: SharedBalloon::default(),
            stage,
            jitter,
            labels: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn with_random_jitter(cfg: &AppConfig, stage: Stage) -> Self {
        Self::new(cfg, stage, Box::new(RandomJitter::new(cfg.animation.jitter)))
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn balloon(&self) -> Balloon {
        self.balloon.snapshot()
    }

    /// A handle that keeps observing the balloon after the session is gone.
    pub fn balloon_handle(&self) -> SharedBalloon {
        self.balloon.clone()
    }

    pub fn label(&self, id: TaskId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_running()
    }

    pub fn is_celebrating(&self) -> bool {
        self.animation.is_running()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Applies a user command. Rejected input is reported as an event.
    pub fn apply(&mut self, command: SessionCommand, now: SystemTime) -> Flow {
        let result = match command {
            SessionCommand::Add(name) => self.add_task(&name, now).map(|_| ()),
            SessionCommand::Toggle(row) => self.toggle_row(row, now).map(|_| ()),
            SessionCommand::ScrollDown => {
                self.scroll_down(now);
                Ok(())
            }
            SessionCommand::ScrollUp => {
                self.scroll_up(now);
                Ok(())
            }
            SessionCommand::Celebrate => {
                self.celebrate(now);
                Ok(())
            }
            SessionCommand::CancelCelebration => {
                self.cancel_celebration();
                Ok(())
            }
            SessionCommand::StartRefresh => {
                self.start_refresh(now);
                Ok(())
            }
            SessionCommand::StopRefresh => {
                self.stop_refresh();
                Ok(())
            }
            SessionCommand::Quit => return Flow::Quit,
        };
        if let Err(error) = result {
            self.events.push(SessionEvent::Rejected {
                reason: error.to_string(),
            });
        }
        Flow::Continue
    }

    /// Every add request arms the refresh timer, even one that is rejected.
    pub fn add_task(&mut self, name: &str, now: SystemTime) -> Result<TaskId, TrackerError> {
        self.start_refresh(now);
        let task = self.registry.add_task(name, now)?;
        let (id, name) = (task.id, task.name.clone());
        self.events.push(SessionEvent::TaskAdded { id, name });
        self.refresh_if_visible(id, now);
        Ok(id)
    }

    pub fn toggle_row(&mut self, row: usize, now: SystemTime) -> Result<TaskStatus, TrackerError> {
        let id = row
            .checked_sub(1)
            .and_then(|index| self.registry.at(index))
            .map(|task| task.id)
            .ok_or_else(|| TrackerError::InvalidArgument(format!("no task in row {row}")))?;
        self.toggle_task(id, now)
    }

    /// Completing the last open task starts the celebration.
    pub fn toggle_task(&mut self, id: TaskId, now: SystemTime) -> Result<TaskStatus, TrackerError> {
        let status = self.registry.toggle_task(id, now)?.status();
        self.events.push(SessionEvent::TaskToggled { id, status });
        self.refresh_if_visible(id, now);
        if status == TaskStatus::Completed && self.registry.all_completed() {
            self.celebrate(now);
        }
        Ok(status)
    }

    pub fn start_refresh(&mut self, now: SystemTime) {
        if self.refresh.start(now) {
            self.events.push(SessionEvent::RefreshStarted);
        }
    }

    pub fn stop_refresh(&mut self) {
        if self.refresh.stop() {
            self.events.push(SessionEvent::RefreshStopped);
        }
    }

    pub fn celebrate(&mut self, now: SystemTime) {
        let restarted = self.animation.trigger(now, &self.stage, &mut self.balloon);
        self.events.push(SessionEvent::CelebrationStarted { restarted });
    }

    pub fn cancel_celebration(&mut self) {
        if self.animation.cancel(&mut self.balloon) {
            self.events.push(SessionEvent::CelebrationCancelled);
        }
    }

    pub fn scroll_down(&mut self, now: SystemTime) {
        if self.viewport.scroll_down(self.registry.len()) {
            self.after_scroll(now);
        }
    }

    pub fn scroll_up(&mut self, now: SystemTime) {
        if self.viewport.scroll_up() {
            self.after_scroll(now);
        }
    }

    /// Fires whichever timers are due at `now` and returns what happened.
    pub fn advance(&mut self, now: SystemTime) -> Vec<SessionEvent> {
        let provider = self.viewport.over(&self.registry);
        let registry = &self.registry;
        let labels = &mut self.labels;
        let mut refreshed = Vec::new();
        let fired = self.refresh.poll(now, &provider, |id| {
            refresh_label(labels, registry, id, now);
            refreshed.push(id);
        });
        if fired.is_some() {
            self.events.push(SessionEvent::RefreshTicked { refreshed });
        }

        match self
            .animation
            .poll(now, &self.stage, self.jitter.as_mut(), &mut self.balloon)
        {
            AnimationTick::Idle => {}
            AnimationTick::Moved { position, fraction } => {
                self.events
                    .push(SessionEvent::BalloonMoved { position, fraction });
            }
            AnimationTick::Finished => self.events.push(SessionEvent::CelebrationFinished),
        }

        self.drain_events()
    }

    /// When the driver should wake next. The refresh tick is due at its
    /// `next_fire`; it only slides into its tolerance window to share a
    /// wakeup with an animation frame that lands inside that window.
    pub fn next_wake(&self) -> Option<SystemTime> {
        let frame = self.animation.next_fire();
        let Some(due) = self.refresh.next_fire() else {
            return frame;
        };
        let latest = self.refresh.latest_fire().unwrap_or(due);
        match frame {
            Some(frame) if frame >= due && frame <= latest => Some(frame),
            Some(frame) => Some(frame.min(due)),
            None => Some(due),
        }
    }

    pub fn shutdown(&mut self) {
        self.stop_refresh();
        self.cancel_celebration();
    }

    fn after_scroll(&mut self, now: SystemTime) {
        self.events.push(SessionEvent::Scrolled {
            offset: self.viewport.offset,
        });
        let visible = self.viewport.over(&self.registry).visible_item_ids();
        for id in visible {
            refresh_label(&mut self.labels, &self.registry, id, now);
        }
    }

    fn refresh_if_visible(&mut self, id: TaskId, now: SystemTime) {
        let visible = self
            .registry
            .position(id)
            .is_some_and(|index| self.viewport.is_visible(index));
        if visible {
            refresh_label(&mut self.labels, &self.registry, id, now);
        }
    }
}

impl Drop for TrackerSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn refresh_label(
    labels: &mut HashMap<TaskId, String>,
    registry: &TaskRegistry,
    id: TaskId,
    now: SystemTime,
) {
    if let Some(task) = registry.get(id) {
        labels.insert(id, elapsed_label(task, now));
    }
}
