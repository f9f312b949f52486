use std::sync::LazyLock;

use regex::Regex;

use hunter_core::DayRange;

static SET_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^set\s+days\b(.*)$").expect("set days pattern"));

/// One inbound text frame, classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Ping,
    Help,
    Uptime,
    Status,
    Diagnostic,
    Reload,
    Stat,
    SetDays(DayRange),
    /// `set days` with a missing, non-numeric or out-of-range argument.
    MalformedSetDays,
    Query(String),
    Empty,
}

impl Command {
    /// Commands match case-insensitively on the whole trimmed input; the leading `/`
    /// is optional.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        let word = trimmed.strip_prefix('/').unwrap_or(trimmed).trim_start();

        match word.to_lowercase().as_str() {
            "ping" => return Self::Ping,
            "help" => return Self::Help,
            "uptime" => return Self::Uptime,
            "status" => return Self::Status,
            "diagnostic" => return Self::Diagnostic,
            "reload" => return Self::Reload,
            "stat" => return Self::Stat,
            _ => {}
        }

        if let Some(caps) = SET_DAYS.captures(word) {
            let arg = caps.get(1).map_or("", |m| m.as_str());
            return match DayRange::parse(arg) {
                Ok(days) => Self::SetDays(days),
                Err(_) => Self::MalformedSetDays,
            };
        }

        Self::Query(trimmed.to_string())
    }
}
