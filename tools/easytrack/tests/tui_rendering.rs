use easytrack::animation::{FixedJitter, Stage};
use easytrack::config::AppConfig;
use easytrack::hotkeys::controls_legend;
use easytrack::runtime::{FakeTerminal, Terminal};
use easytrack::session::TrackerSession;
use easytrack::tui::{render_task_list, ListView};
use std::time::{Duration, SystemTime};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn session(rows: u16) -> TrackerSession {
    let mut cfg = AppConfig::default();
    cfg.screen.rows = rows;
    let stage = Stage {
        screen_width: 80.0,
        screen_height: 24.0,
        element_size: 3.0,
    };
    TrackerSession::new(&cfg, stage, Box::new(FixedJitter(0.0)))
}

#[test]
fn list_view_only_contains_rows_in_the_viewport() {
    let mut session = session(2);
    for name in ["dishes", "email", "gym"] {
        session.add_task(name, at(0)).expect("add");
    }
    session.scroll_down(at(1));

    let view = ListView::from_session(&session);
    assert_eq!(view.total, 3);
    assert_eq!(view.offset, 1);
    let names = view.rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["email", "gym"]);
    assert_eq!(view.rows[0].row, 2);

    let frame = render_task_list(&view, &controls_legend(), 100, 14).expect("render");
    assert!(frame.contains("Tasks 2-3 of 3"));
    assert!(!frame.contains("dishes"));
    assert!(frame.contains("not started"));
}

#[test]
fn celebration_frame_shows_balloon_and_is_captured_by_terminal() {
    let terminal = FakeTerminal::new(true);
    let mut session = session(5);
    let id = session.add_task("ship it", at(0)).expect("add");
    session.toggle_task(id, at(1)).expect("start");
    session.toggle_task(id, at(2)).expect("complete");

    let frame = render_task_list(&ListView::from_session(&session), "", 80, 14).expect("render");
    terminal.draw(&frame).expect("draw");

    let frames = terminal.drawn_frames();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].contains("[x] ship it"));
    assert!(frames[0].contains("Completed"));
    assert!(frames[0].contains("Balloon: x=40.0 y=28.5"));
}

#[test]
fn empty_list_renders_in_a_tiny_terminal() {
    let session = session(3);
    let frame = render_task_list(&ListView::from_session(&session), &controls_legend(), 20, 9)
        .expect("render");
    assert_eq!(frame.lines().count(), 9);
    assert!(frame.contains("refresh=off") || frame.contains("Balloon"));
}
