use crate::errors::TrackerError;
use crate::hotkeys::{controls_legend, ParsedInput};
use crate::logging::{structured_line, JsonlLogger, LogEvent};
use crate::runtime::{Clock, Terminal};
use crate::session::{Flow, SessionEvent, TrackerSession};
use crate::tui::{render_task_list, ListView};
use serde_json::json;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// Upper bound on a single sleep, so queued input is never left waiting long.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default)]
pub struct EventLoopOptions {
    pub quit_after: Option<Duration>,
    pub draw_frames: bool,
    pub frame_size: (u16, u16),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub refresh_ticks: u64,
    pub balloon_frames: u64,
    pub celebrations_started: u64,
    pub celebrations_finished: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitReason {
    Quit,
    Deadline,
    InputClosed,
}

impl ExitReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Deadline => "deadline",
            Self::InputClosed => "input_closed",
        }
    }
}

/// Writes session events to the terminal and the optional run log.
pub struct Reporter<'a> {
    terminal: &'a dyn Terminal,
    logger: Option<JsonlLogger>,
    draw_frames: bool,
    frame_size: (u16, u16),
}

impl<'a> Reporter<'a> {
    pub fn new(
        terminal: &'a dyn Terminal,
        logger: Option<JsonlLogger>,
        draw_frames: bool,
        frame_size: (u16, u16),
    ) -> Self {
        Self {
            terminal,
            logger,
            draw_frames,
            frame_size,
        }
    }

    pub fn log(&self, level: &str, event_type: &str, payload: serde_json::Value) -> Result<(), TrackerError> {
        match &self.logger {
            Some(logger) => logger.append(&LogEvent {
                level,
                event_type,
                payload,
            }),
            None => Ok(()),
        }
    }

    pub fn report(&self, session: &TrackerSession, events: &[SessionEvent]) -> Result<(), TrackerError> {
        for event in events {
            self.log_event(event)?;
        }
        if events.is_empty() {
            return Ok(());
        }
        if self.draw_frames {
            let (width, height) = self.frame_size;
            let frame = render_task_list(&ListView::from_session(session), &controls_legend(), width, height)?;
            return self.terminal.draw(&frame);
        }
        for event in events {
            for line in plain_lines(session, event) {
                self.terminal.write_line(&line)?;
            }
        }
        Ok(())
    }

    pub fn unknown_input(&self, line: &str) -> Result<(), TrackerError> {
        self.log("warn", "unknown_input", json!({ "line": line }))?;
        self.terminal.write_line(&structured_line("input", "unknown", line))
    }

    fn log_event(&self, event: &SessionEvent) -> Result<(), TrackerError> {
        match event {
            SessionEvent::TaskAdded { id, name } => {
                self.log("info", "task_added", json!({ "task": id.0, "name": name }))
            }
            SessionEvent::TaskToggled { id, status } => self.log(
                "info",
                "task_toggled",
                json!({ "task": id.0, "status": status.as_str() }),
            ),
            SessionEvent::Rejected { reason } => {
                self.log("warn", "command_rejected", json!({ "reason": reason }))
            }
            SessionEvent::Scrolled { offset } => {
                self.log("debug", "list_scrolled", json!({ "offset": offset }))
            }
            SessionEvent::RefreshStarted => self.log("info", "refresh_started", json!({})),
            SessionEvent::RefreshStopped => self.log("info", "refresh_stopped", json!({})),
            SessionEvent::RefreshTicked { refreshed } => self.log(
                "debug",
                "refresh_tick",
                json!({ "refreshed": refreshed.iter().map(|id| id.0).collect::<Vec<_>>() }),
            ),
            SessionEvent::CelebrationStarted { restarted } => self.log(
                "info",
                if *restarted {
                    "celebration_restarted"
                } else {
                    "celebration_started"
                },
                json!({}),
            ),
            // Per-frame moves are too chatty for the run log.
            SessionEvent::BalloonMoved { .. } => Ok(()),
            SessionEvent::CelebrationFinished => {
                self.log("info", "celebration_finished", json!({}))
            }
            SessionEvent::CelebrationCancelled => {
                self.log("info", "celebration_cancelled", json!({}))
            }
        }
    }
}

fn plain_lines(session: &TrackerSession, event: &SessionEvent) -> Vec<String> {
    match event {
        SessionEvent::TaskAdded { id, name } => {
            vec![structured_line(&id.to_string(), "added", name)]
        }
        SessionEvent::TaskToggled { id, status } => {
            vec![structured_line(&id.to_string(), "toggled", status.as_str())]
        }
        SessionEvent::Rejected { reason } => vec![structured_line("session", "rejected", reason)],
        SessionEvent::Scrolled { offset } => {
            vec![structured_line("list", "scrolled", &format!("offset={offset}"))]
        }
        SessionEvent::RefreshStarted => vec![structured_line("refresh", "started", "")],
        SessionEvent::RefreshStopped => vec![structured_line("refresh", "stopped", "")],
        SessionEvent::RefreshTicked { refreshed } => refreshed
            .iter()
            .map(|id| {
                structured_line(
                    &id.to_string(),
                    "elapsed",
                    session.label(*id).unwrap_or_default(),
                )
            })
            .collect(),
        SessionEvent::CelebrationStarted { restarted } => {
            let event = if *restarted { "restarted" } else { "started" };
            vec![structured_line("balloon", event, "")]
        }
        SessionEvent::BalloonMoved { .. } => Vec::new(),
        SessionEvent::CelebrationFinished => vec![structured_line("balloon", "finished", "")],
        SessionEvent::CelebrationCancelled => vec![structured_line("balloon", "cancelled", "")],
    }
}

/// Drives one session on the current thread until it quits, the deadline
/// passes, or input closes with no celebration in flight.
pub fn run_event_loop(
    session: &mut TrackerSession,
    input: &mut UnboundedReceiver<ParsedInput>,
    clock: &dyn Clock,
    reporter: &Reporter<'_>,
    options: &EventLoopOptions,
) -> Result<RunSummary, TrackerError> {
    let started = clock.now();
    let deadline = options.quit_after.map(|after| started + after);
    let mut summary = RunSummary::default();
    let mut input_open = true;
    reporter.log(
        "info",
        "session_started",
        json!({ "tasks": session.registry().len() }),
    )?;

    let reason = loop {
        summary.iterations += 1;
        let mut quit = false;
        while input_open && !quit {
            match input.try_recv() {
                Ok(ParsedInput::Command(command)) => {
                    quit = session.apply(command, clock.now()) == Flow::Quit;
                }
                Ok(ParsedInput::Unknown(line)) => reporter.unknown_input(&line)?,
                Ok(ParsedInput::Blank) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => input_open = false,
            }
        }

        let now = clock.now();
        let events = session.advance(now);
        tally(&mut summary, &events);
        reporter.report(session, &events)?;

        if quit {
            break ExitReason::Quit;
        }
        if deadline.is_some_and(|deadline| now >= deadline) {
            break ExitReason::Deadline;
        }
        if !input_open && deadline.is_none() && !session.is_celebrating() {
            break ExitReason::InputClosed;
        }

        clock.sleep_until(next_wake(session, now, deadline))?;
    };

    session.shutdown();
    let events = session.drain_events();
    tally(&mut summary, &events);
    reporter.report(session, &events)?;
    reporter.log(
        "info",
        "session_finished",
        json!({
            "reason": reason.as_str(),
            "tasks": session.registry().len(),
            "refresh_ticks": summary.refresh_ticks,
            "celebrations_finished": summary.celebrations_finished,
        }),
    )?;
    Ok(summary)
}

fn next_wake(session: &TrackerSession, now: SystemTime, deadline: Option<SystemTime>) -> SystemTime {
    [
        session.next_wake(),
        Some(now + IDLE_POLL_INTERVAL),
        deadline,
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(now + IDLE_POLL_INTERVAL)
}

fn tally(summary: &mut RunSummary, events: &[SessionEvent]) {
    for event in events {
        match event {
            SessionEvent::RefreshTicked { .. } => summary.refresh_ticks += 1,
            SessionEvent::BalloonMoved { .. } => summary.balloon_frames += 1,
            SessionEvent::CelebrationStarted { .. } => summary.celebrations_started += 1,
            SessionEvent::CelebrationFinished => summary.celebrations_finished += 1,
            SessionEvent::Rejected { .. } => summary.rejected += 1,
            _ => {}
        }
    }
}
