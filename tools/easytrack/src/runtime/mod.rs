use crate::errors::TrackerError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

pub const FALLBACK_TERMINAL_SIZE: (u16, u16) = (80, 24);

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    fn sleep_until(&self, deadline: SystemTime) -> Result<(), TrackerError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, TrackerError>;
}

pub trait Terminal: Send + Sync {
    fn stdin_is_tty(&self) -> bool;
    /// Columns and rows available for drawing.
    fn size(&self) -> (u16, u16);
    fn write_line(&self, line: &str) -> Result<(), TrackerError>;
    fn draw(&self, frame: &str) -> Result<(), TrackerError>;
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), TrackerError> {
        let now = SystemTime::now();
        if let Ok(duration) = deadline.duration_since(now) {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, TrackerError> {
        std::fs::read_to_string(path).map_err(|e| TrackerError::Io(e.to_string()))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn stdin_is_tty(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
    }

    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or(FALLBACK_TERMINAL_SIZE)
    }

    fn write_line(&self, line: &str) -> Result<(), TrackerError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| TrackerError::Io(e.to_string()))
    }

    fn draw(&self, frame: &str) -> Result<(), TrackerError> {
        use crossterm::{cursor, terminal, QueueableCommand};
        use std::io::Write;
        let mut out = std::io::stdout();
        out.queue(terminal::Clear(terminal::ClearType::All))
            .map_err(|e| TrackerError::Io(e.to_string()))?;
        out.queue(cursor::MoveTo(0, 0))
            .map_err(|e| TrackerError::Io(e.to_string()))?;
        write!(out, "{frame}").map_err(|e| TrackerError::Io(e.to_string()))?;
        out.flush().map_err(|e| TrackerError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub clock: Arc<dyn Clock>,
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ProductionClock),
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }

    pub fn with_parts(
        clock: Arc<dyn Clock>,
        file_system: Arc<dyn FileSystem>,
        terminal: Arc<dyn Terminal>,
    ) -> Self {
        Self {
            clock,
            file_system,
            terminal,
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<SystemTime>>,
    sleeps: Arc<Mutex<Vec<SystemTime>>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sleeps(&self) -> Vec<SystemTime> {
        self.sleeps.lock().expect("sleep lock").clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().expect("clock lock")
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), TrackerError> {
        self.sleeps.lock().expect("sleep lock").push(deadline);
        let mut now = self.now.lock().expect("clock lock");
        if deadline > *now {
            *now = deadline;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    fail_next: Arc<Mutex<Option<TrackerError>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
        fs
    }

    pub fn set_fail_next(&self, error: TrackerError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    fn maybe_fail(&self) -> Result<(), TrackerError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, TrackerError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| TrackerError::Io(format!("missing file {}", path.display())))
    }
}

#[derive(Clone)]
pub struct FakeTerminal {
    pub is_tty: bool,
    pub size: (u16, u16),
    writes: Arc<Mutex<Vec<String>>>,
    draws: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn new(is_tty: bool) -> Self {
        Self {
            is_tty,
            size: FALLBACK_TERMINAL_SIZE,
            writes: Arc::new(Mutex::new(Vec::new())),
            draws: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }

    pub fn drawn_frames(&self) -> Vec<String> {
        self.draws.lock().expect("draw lock").clone()
    }
}

impl Default for FakeTerminal {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Terminal for FakeTerminal {
    fn stdin_is_tty(&self) -> bool {
        self.is_tty
    }

    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn write_line(&self, line: &str) -> Result<(), TrackerError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }

    fn draw(&self, frame: &str) -> Result<(), TrackerError> {
        self.draws
            .lock()
            .expect("draw lock")
            .push(frame.to_string());
        Ok(())
    }
}
