use crate::errors::TrackerError;
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub created_at: SystemTime,
    pub started_at: Option<SystemTime>,
    pub completed_at: Option<SystemTime>,
    pub completed: bool,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else if self.started_at.is_some() {
            TaskStatus::Running
        } else {
            TaskStatus::Pending
        }
    }
}

/// Ordered task list. Insertion order is display order, newest last.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add_task(&mut self, name: &str, now: SystemTime) -> Result<&Task, TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::InvalidArgument(
                "task name must not be empty".to_string(),
            ));
        }
        let id = TaskId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.tasks.push(Task {
            id,
            name: name.to_string(),
            created_at: now,
            started_at: None,
            completed_at: None,
            completed: false,
        });
        let index = self.tasks.len() - 1;
        Ok(&self.tasks[index])
    }

    pub fn toggle_task(&mut self, id: TaskId, now: SystemTime) -> Result<&Task, TrackerError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| TrackerError::InvalidArgument(format!("unknown task {id}")))?;

        match task.status() {
            TaskStatus::Pending => task.started_at = Some(now),
            TaskStatus::Running => {
                task.completed = true;
                task.completed_at = Some(now);
            }
            TaskStatus::Completed => {
                task.completed = false;
                task.completed_at = None;
            }
        }
        Ok(task)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Zero-based display position.
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn all_completed(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|task| task.completed)
    }
}

pub fn elapsed_label(task: &Task, now: SystemTime) -> String {
    match (task.status(), task.started_at) {
        (TaskStatus::Completed, _) => "Completed".to_string(),
        (_, None) => "not started".to_string(),
        (_, Some(started_at)) => {
            let secs = now
                .duration_since(started_at)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0);
            format_elapsed(secs)
        }
    }
}

pub fn format_elapsed(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = total_secs / 60 % 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::{elapsed_label, format_elapsed, TaskId, TaskRegistry, TaskStatus};
    use crate::errors::TrackerError;
    use std::time::{Duration, SystemTime};

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn add_appends_trimmed_task_last() {
        let mut registry = TaskRegistry::new();
        registry.add_task("first", at(0)).expect("add");
        let added = registry.add_task("  second  ", at(1)).expect("add").clone();

        assert_eq!(registry.len(), 2);
        assert_eq!(added.name, "second");
        assert_eq!(added.started_at, None);
        assert_eq!(registry.iter().last().map(|t| t.id), Some(added.id));
        assert_eq!(registry.ids(), vec![TaskId(1), TaskId(2)]);
    }

    #[test]
    fn blank_names_are_rejected_without_side_effects() {
        let mut registry = TaskRegistry::new();
        for name in ["", "   ", "\t\n"] {
            let err = registry.add_task(name, at(0)).expect_err("must reject");
            assert!(matches!(err, TrackerError::InvalidArgument(_)));
        }
        assert!(registry.is_empty());
        registry.add_task("next", at(0)).expect("add");
        assert_eq!(registry.ids(), vec![TaskId(1)]);
    }

    #[test]
    fn toggle_cycles_pending_running_completed() {
        let mut registry = TaskRegistry::new();
        let id = registry.add_task("walk", at(0)).expect("add").id;
        assert_eq!(registry.get(id).map(|t| t.status()), Some(TaskStatus::Pending));

        let task = registry.toggle_task(id, at(5)).expect("start");
        assert_eq!(task.status(), TaskStatus::Running);
        assert_eq!(task.started_at, Some(at(5)));

        let task = registry.toggle_task(id, at(9)).expect("complete");
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(at(9)));
        assert!(registry.all_completed());

        let task = registry.toggle_task(id, at(12)).expect("reopen");
        assert_eq!(task.status(), TaskStatus::Running);
        assert_eq!(task.started_at, Some(at(5)));
        assert!(!registry.all_completed());
    }

    #[test]
    fn toggling_unknown_task_is_invalid_argument() {
        let mut registry = TaskRegistry::new();
        let err = registry.toggle_task(TaskId(42), at(0)).expect_err("unknown");
        assert!(matches!(err, TrackerError::InvalidArgument(message) if message.contains("task-42")));
    }

    #[test]
    fn elapsed_labels_follow_status() {
        let mut registry = TaskRegistry::new();
        let id = registry.add_task("walk", at(0)).expect("add").id;
        let task = registry.get(id).cloned().expect("task");
        assert_eq!(elapsed_label(&task, at(100)), "not started");

        registry.toggle_task(id, at(100)).expect("start");
        let task = registry.get(id).cloned().expect("task");
        assert_eq!(elapsed_label(&task, at(100 + 3723)), "1h 2m 3s");

        registry.toggle_task(id, at(5000)).expect("complete");
        let task = registry.get(id).cloned().expect("task");
        assert_eq!(elapsed_label(&task, at(6000)), "Completed");
    }

    #[test]
    fn zero_components_are_omitted_except_seconds() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(60), "1m 0s");
        assert_eq!(format_elapsed(3605), "1h 5s");
    }
}
