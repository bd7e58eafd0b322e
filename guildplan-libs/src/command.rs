use crate::matrix::day_label;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Title used when a command carries no text after the time range
pub const DEFAULT_TITLE: &str = "BG3 event";
pub const MAX_WEEK_OFFSET: u32 = 52;

static COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\+([0-9]+)\s+)?(\S+)\s+([0-9]{1,2})\s*[-–]\s*([0-9]{1,2})\s*(.*)$")
        .expect("command pattern is a valid regex")
});

#[derive(Error, Debug, Eq, PartialEq, Clone)]
pub enum ParseError {
    #[error("Format: `so 20-24 raid` or `+1 so 20-24 raid`")]
    Format,
    #[error("Week prefix: `+0` to `+52` (e.g. `+1 so 20-24 raid`), got `{0}`")]
    WeekOffset(String),
    #[error("Unknown day `{0}`, use one of: po út st čt pá so ne")]
    Day(String),
    #[error("Time: start 0–23, end 1–24 and end > start (e.g. 20-24), got {start}-{end}")]
    TimeRange { start: String, end: String },
}

/// A parsed bot command, e.g. `+1 so 20-24 raid`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventCommand {
    pub week_offset: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day: u8,
    pub start_hour: u8,
    /// Exclusive, may be 24
    pub end_hour: u8,
    pub title: String,
}

impl EventCommand {
    /// `So 20:00–24:00 • raid`
    pub fn summary(&self) -> String {
        format!(
            "{} {:02}:00–{:02}:00 • {}",
            day_label(self.day as usize), self.start_hour, self.end_hour, self.title
        )
    }
}

/// Maps a Czech weekday abbreviation to its 0-based index, Monday first
pub fn day_index(token: &str) -> Option<u8> {
    match token.to_lowercase().as_str() {
        "po" => Some(0),
        "ut" | "út" => Some(1),
        "st" => Some(2),
        "ct" | "čt" => Some(3),
        "pa" | "pá" => Some(4),
        "so" => Some(5),
        "ne" => Some(6),
        _ => None,
    }
}

/// Parses `[+N ]<day> <start>-<end>[ title]`.
///
/// # Examples
/// ```
/// use guildplan_libs::command::{parse_command, ParseError};
///
/// let command = parse_command("+1 ut 18–20").unwrap();
/// assert_eq!(command.week_offset, 1);
/// assert_eq!((command.day, command.start_hour, command.end_hour), (1, 18, 20));
/// assert_eq!(command.title, "BG3 event");
///
/// assert!(matches!(parse_command("raid tonight"), Err(ParseError::Format)));
/// ```
pub fn parse_command(text: &str) -> Result<EventCommand, ParseError> {
    let captures = COMMAND.captures(text.trim()).ok_or(ParseError::Format)?;
    let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

    let week_offset = match captures.get(1) {
        None => 0,
        Some(raw) => raw
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|offset| *offset <= MAX_WEEK_OFFSET)
            .ok_or_else(|| ParseError::WeekOffset(raw.as_str().to_string()))?,
    };

    let day = day_index(group(2)).ok_or_else(|| ParseError::Day(group(2).to_string()))?;

    let range_error = || ParseError::TimeRange {
        start: group(3).to_string(),
        end: group(4).to_string(),
    };
    let start_hour = group(3).parse::<u8>().map_err(|_| range_error())?;
    let end_hour = group(4).parse::<u8>().map_err(|_| range_error())?;
    if start_hour > 23 || !(1..=24).contains(&end_hour) || end_hour <= start_hour {
        return Err(range_error());
    }

    let title = match group(5).trim() {
        "" => DEFAULT_TITLE.to_string(),
        title => title.to_string(),
    };

    Ok(EventCommand {
        week_offset,
        day,
        start_hour,
        end_hour,
        title,
    })
}
