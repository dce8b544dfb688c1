use crate::session::SessionCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: &'static str,
    pub action: &'static str,
}

pub const LIST_BINDINGS: [HotkeyBinding; 5] = [
    HotkeyBinding {
        key: "add <name>",
        action: "add task",
    },
    HotkeyBinding {
        key: "toggle <n>",
        action: "start/complete row n",
    },
    HotkeyBinding {
        key: "j",
        action: "scroll down",
    },
    HotkeyBinding {
        key: "k",
        action: "scroll up",
    },
    HotkeyBinding {
        key: "q",
        action: "quit",
    },
];

pub const TIMER_BINDINGS: [HotkeyBinding; 4] = [
    HotkeyBinding {
        key: "celebrate",
        action: "launch balloon",
    },
    HotkeyBinding {
        key: "cancel",
        action: "stop balloon",
    },
    HotkeyBinding {
        key: "start",
        action: "start refresh",
    },
    HotkeyBinding {
        key: "stop",
        action: "stop refresh",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Command(SessionCommand),
    Blank,
    Unknown(String),
}

pub fn controls_legend() -> String {
    let mut bindings = LIST_BINDINGS.to_vec();
    bindings.extend(TIMER_BINDINGS);
    format_bindings("Keys: ", &bindings)
}

pub fn parse_command(line: &str) -> ParsedInput {
    let line = line.trim();
    if line.is_empty() {
        return ParsedInput::Blank;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let command = match (head.to_ascii_lowercase().as_str(), rest) {
        ("add" | "a", name) => Some(SessionCommand::Add(name.to_string())),
        ("toggle" | "t", row) => row.parse::<usize>().ok().map(SessionCommand::Toggle),
        ("j" | "down", "") => Some(SessionCommand::ScrollDown),
        ("k" | "up", "") => Some(SessionCommand::ScrollUp),
        ("celebrate", "") => Some(SessionCommand::Celebrate),
        ("cancel", "") => Some(SessionCommand::CancelCelebration),
        ("start", "") => Some(SessionCommand::StartRefresh),
        ("stop", "") => Some(SessionCommand::StopRefresh),
        ("q" | "quit", "") => Some(SessionCommand::Quit),
        _ => None,
    };

    command.map_or_else(|| ParsedInput::Unknown(line.to_string()), ParsedInput::Command)
}

fn format_bindings(prefix: &str, bindings: &[HotkeyBinding]) -> String {
    let parts = bindings
        .iter()
        .map(|binding| format!("{} {}", binding.key, binding.action))
        .collect::<Vec<_>>();
    format!("{prefix}{}", parts.join("  "))
}
