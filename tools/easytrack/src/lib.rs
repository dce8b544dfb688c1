pub mod animation;
pub mod config;
pub mod errors;
pub mod event_loop;
pub mod hotkeys;
pub mod logging;
pub mod refresh_loop;
pub mod runtime;
pub mod session;
pub mod task_registry;
pub mod timer;
pub mod tui;
pub mod viewport;

use animation::Stage;
use clap::{error::ErrorKind, Parser};
use config::{load_config, seconds_to_duration, AppConfig, CliOverrides};
use errors::TrackerError;
use event_loop::{run_event_loop, EventLoopOptions, Reporter, RunSummary};
use hotkeys::{parse_command, ParsedInput};
use logging::JsonlLogger;
use runtime::{ProductionRuntime, Terminal};
use session::TrackerSession;
use std::io::BufRead;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Debug, Clone, Parser)]
#[command(name = "easytrack")]
#[command(about = "Task list with live elapsed times and a celebration balloon")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// Task to add before reading input; repeatable.
    #[arg(long = "task")]
    pub tasks: Vec<String>,
    /// Stop after this many seconds.
    #[arg(long = "quit-after")]
    pub quit_after: Option<f64>,
    /// Number of list rows on screen.
    #[arg(long)]
    pub rows: Option<u16>,
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
    /// Write plain event lines even on a terminal.
    #[arg(long, default_value_t = false)]
    pub headless: bool,
}

pub fn run() -> Result<i32, TrackerError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let parsed = parse_command(&line);
            if parsed == ParsedInput::Blank {
                continue;
            }
            if tx.send(parsed).is_err() {
                break;
            }
        }
    });
    run_with_runtime(&args, &runtime, rx)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    runtime: &ProductionRuntime,
    mut input: UnboundedReceiver<ParsedInput>,
) -> Result<i32, TrackerError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(TrackerError::Cli(error.to_string())),
        },
    };

    let quit_after = cli
        .quit_after
        .map(|secs| seconds_to_duration("--quit-after", secs))
        .transpose()
        .map_err(TrackerError::Cli)?;

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        rows: cli.rows,
        log_file: cli.log_file.clone(),
    };
    let cfg = load_config(&overrides, runtime.file_system.as_ref())?;

    let terminal_size = runtime.terminal.size();
    let stage = stage_for(&cfg, terminal_size);
    let logger = cfg.logging.path.as_ref().map(|path| JsonlLogger {
        path: path.clone(),
        max_payload_bytes: cfg.logging.max_payload_bytes,
        budget_bytes: cfg.logging.budget_bytes,
    });
    let draw_frames = !cli.headless && runtime.terminal.stdin_is_tty();
    let reporter = Reporter::new(runtime.terminal.as_ref(), logger, draw_frames, terminal_size);

    let mut session = TrackerSession::with_random_jitter(&cfg, stage);
    let now = runtime.clock.now();
    for name in &cli.tasks {
        session.add_task(name, now)?;
    }

    let summary = run_event_loop(
        &mut session,
        &mut input,
        runtime.clock.as_ref(),
        &reporter,
        &EventLoopOptions {
            quit_after,
            draw_frames,
            frame_size: terminal_size,
        },
    )?;
    write_summary(runtime.terminal.as_ref(), &summary, draw_frames)?;
    Ok(0)
}

/// Screen geometry from config, falling back to the terminal size.
pub fn stage_for(cfg: &AppConfig, terminal_size: (u16, u16)) -> Stage {
    let width = cfg.screen.width.unwrap_or(terminal_size.0);
    let height = cfg.screen.height.unwrap_or(terminal_size.1);
    Stage {
        screen_width: f64::from(width),
        screen_height: f64::from(height),
        element_size: cfg.animation.element_size,
    }
}

fn write_summary(
    terminal: &dyn Terminal,
    summary: &RunSummary,
    draw_frames: bool,
) -> Result<(), TrackerError> {
    if draw_frames {
        return Ok(());
    }
    terminal.write_line(&logging::structured_line(
        "session",
        "finished",
        &format!(
            "refresh_ticks={} celebrations={}",
            summary.refresh_ticks, summary.celebrations_finished
        ),
    ))
}
