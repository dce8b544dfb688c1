use crate::errors::TrackerError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;

/// Append-only JSONL run log.
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: 4096,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), TrackerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| TrackerError::Io(e.to_string()))?;
            }
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| TrackerError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TrackerError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| TrackerError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| TrackerError::Io(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = enforce_total_budget(parent, self.budget_bytes, &self.path)?;
        }

        Ok(())
    }
}

/// Plain line used when no frame can be drawn.
pub fn structured_line(subject: &str, event: &str, message: &str) -> String {
    format!(
        "subject={subject} event={event} message={} ",
        message.replace('\n', "\\n")
    )
}

/// Deletes the oldest `.jsonl` files in `dir` until the total fits `budget_bytes`.
/// The active log is never removed.
pub fn enforce_total_budget(
    dir: &Path,
    budget_bytes: u64,
    active: &Path,
) -> Result<Vec<PathBuf>, TrackerError> {
    let mut files = fs::read_dir(dir)
        .map_err(|e| TrackerError::Io(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect::<Vec<_>>();

    files.sort_by(|a, b| {
        let ma = fs::metadata(a).ok().and_then(|m| m.modified().ok());
        let mb = fs::metadata(b).ok().and_then(|m| m.modified().ok());
        ma.cmp(&mb)
    });

    let mut total = files
        .iter()
        .filter_map(|path| fs::metadata(path).ok().map(|meta| meta.len()))
        .sum::<u64>();

    let mut deleted = Vec::new();
    for path in files {
        if total <= budget_bytes {
            break;
        }
        if path == active {
            continue;
        }
        let len = fs::metadata(&path)
            .map_err(|e| TrackerError::Io(e.to_string()))?
            .len();
        fs::remove_file(&path).map_err(|e| TrackerError::Io(e.to_string()))?;
        total = total.saturating_sub(len);
        deleted.push(path);
    }

    Ok(deleted)
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

#[cfg(test)]
mod tests {
    use super::{enforce_total_budget, structured_line, JsonlLogger, LogEvent};
    use serde_json::json;
    use std::fs;

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;
        logger.budget_bytes = 1024;

        logger
            .append(&LogEvent {
                level: "info",
                event_type: "task_added",
                payload: json!({"name": "abcdefghijklmnopqrstuvwxyz"}),
            })
            .expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"event_type\":\"task_added\""));
        assert!(text.contains("..."));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn structured_line_is_deterministic() {
        let line = structured_line("task-1", "toggled", "hello\nworld");
        assert_eq!(line, "subject=task-1 event=toggled message=hello\\nworld ");
    }

    #[test]
    fn budget_prunes_oldest_logs_but_keeps_active_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.jsonl"), vec![b'x'; 40]).expect("a");
        std::thread::sleep(std::time::Duration::from_millis(2));
        fs::write(dir.path().join("notes.txt"), vec![b'x'; 40]).expect("txt");
        fs::write(dir.path().join("b.jsonl"), vec![b'x'; 40]).expect("b");

        let active = dir.path().join("b.jsonl");
        let deleted = enforce_total_budget(dir.path(), 50, &active).expect("pruned");
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].ends_with("a.jsonl"));
        assert!(dir.path().join("notes.txt").exists());

        let deleted = enforce_total_budget(dir.path(), 10, &active).expect("pruned");
        assert!(deleted.is_empty());
        assert!(active.exists());
    }
}
