use crate::animation::Balloon;
use crate::errors::TrackerError;
use crate::session::TrackerSession;
use crate::task_registry::TaskStatus;
use ratatui::backend::TestBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Terminal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub row: usize,
    pub name: String,
    pub status: TaskStatus,
    /// Last published elapsed-time text; stale for rows that were off screen.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub rows: Vec<TaskRow>,
    pub total: usize,
    pub offset: usize,
    pub refreshing: bool,
    pub balloon: Balloon,
}

impl ListView {
    pub fn from_session(session: &TrackerSession) -> Self {
        let registry = session.registry();
        let viewport = session.viewport();
        let rows = viewport
            .visible_range(registry.len())
            .filter_map(|index| registry.at(index).map(|task| (index, task)))
            .map(|(index, task)| TaskRow {
                row: index + 1,
                name: task.name.clone(),
                status: task.status(),
                label: session.label(task.id).unwrap_or_default().to_string(),
            })
            .collect();
        Self {
            rows,
            total: registry.len(),
            offset: viewport.offset,
            refreshing: session.is_refreshing(),
            balloon: session.balloon(),
        }
    }
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Gray,
        TaskStatus::Running => Color::Yellow,
        TaskStatus::Completed => Color::Green,
    }
}

pub fn render_task_list(
    view: &ListView,
    legend: &str,
    width: u16,
    height: u16,
) -> Result<String, TrackerError> {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).map_err(|e| TrackerError::Io(e.to_string()))?;
    terminal
        .draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(3),
                    Constraint::Length(3),
                    Constraint::Length(3),
                ])
                .split(frame.area());

            let items = view
                .rows
                .iter()
                .map(|row| {
                    let marker = if row.status == TaskStatus::Completed {
                        "[x]"
                    } else {
                        "[ ]"
                    };
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{:>3}. {marker} ", row.row)),
                        Span::styled(row.name.clone(), Style::default().fg(status_color(row.status))),
                        Span::raw(format!("  {}", row.label)),
                    ]))
                })
                .collect::<Vec<_>>();
            let title = format!(
                "Tasks {}-{} of {}",
                (view.offset + 1).min(view.total),
                view.offset + view.rows.len(),
                view.total
            );
            frame.render_widget(
                List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
                chunks[0],
            );

            let balloon = match (view.balloon.visible, view.balloon.position) {
                (true, Some(position)) => {
                    format!("Balloon: x={:.1} y={:.1}", position.x, position.y)
                }
                _ => "Balloon: hidden".to_string(),
            };
            let refresh = if view.refreshing { "on" } else { "off" };
            frame.render_widget(
                Paragraph::new(format!("{balloon} | refresh={refresh}"))
                    .block(Block::default().borders(Borders::ALL).title("Timers")),
                chunks[1],
            );

            frame.render_widget(
                Paragraph::new(legend.to_string())
                    .block(Block::default().borders(Borders::ALL).title("Controls")),
                chunks[2],
            );
        })
        .map_err(|e| TrackerError::Io(e.to_string()))?;

    let mut out = String::new();
    let buffer = terminal.backend().buffer().clone();
    for y in 0..height {
        for x in 0..width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}
