//! Wire codecs for events
//!
//! Two formats are accepted on the ingest socket:
//!
//! - **Text**: `name|value|timestampNanos|label:value|label:value|...`
//! - **JSON**: `{"event": "...", "labels": {...}, "value": 1.5, "ts": 0}`
//!
//! A timestamp of `0` (or an empty timestamp field) means the producer did
//! not stamp the event; the decoder stamps it with the current time.

use super::types::{now_nanos, Event};
use std::collections::HashMap;
use std::fmt::Write;

/// Minimum number of `|`-separated sections in a text event
const MIN_SECTIONS: usize = 3;

const SECTION_SEPARATOR: char = '|';
const LABEL_SEPARATOR: char = ':';

/// Error type for event decoding
#[derive(Debug)]
pub enum EventParseError {
    /// Fewer than `name|value|timestamp` sections
    TooFewSections(usize),
    /// Value field is not a float
    InvalidValue(String),
    /// Timestamp field is not an integer
    InvalidTimestamp(String),
    /// Label section without a `key:` prefix
    InvalidLabel(String),
    /// Datagram is not UTF-8
    InvalidUtf8,
    /// Malformed JSON event
    Json(serde_json::Error),
}

impl std::fmt::Display for EventParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventParseError::TooFewSections(n) => {
                write!(f, "invalid event: {} sections, need at least {}", n, MIN_SECTIONS)
            }
            EventParseError::InvalidValue(v) => write!(f, "invalid event value: {:?}", v),
            EventParseError::InvalidTimestamp(v) => write!(f, "invalid event timestamp: {:?}", v),
            EventParseError::InvalidLabel(v) => write!(f, "invalid label: {:?}", v),
            EventParseError::InvalidUtf8 => write!(f, "event is not valid UTF-8"),
            EventParseError::Json(e) => write!(f, "invalid JSON event: {}", e),
        }
    }
}

impl std::error::Error for EventParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EventParseError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EventParseError {
    fn from(e: serde_json::Error) -> Self {
        EventParseError::Json(e)
    }
}

/// Decode a text-format event
pub fn parse_text(line: &str) -> Result<Event, EventParseError> {
    let sections: Vec<&str> = line.split(SECTION_SEPARATOR).collect();
    if sections.len() < MIN_SECTIONS {
        return Err(EventParseError::TooFewSections(sections.len()));
    }

    let name = sections[0].to_string();
    let value: f64 = sections[1]
        .parse()
        .map_err(|_| EventParseError::InvalidValue(sections[1].to_string()))?;
    let timestamp_nanos = parse_timestamp(sections[2])?;

    let mut labels = HashMap::with_capacity(sections.len() - MIN_SECTIONS);
    for section in &sections[MIN_SECTIONS..] {
        match section.split_once(LABEL_SEPARATOR) {
            Some((key, value)) if !key.is_empty() => {
                labels.insert(key.to_string(), value.to_string());
            }
            _ => return Err(EventParseError::InvalidLabel(section.to_string())),
        }
    }

    Ok(Event {
        name,
        labels,
        value,
        timestamp_nanos,
    })
}

fn parse_timestamp(field: &str) -> Result<i64, EventParseError> {
    if field.is_empty() {
        return Ok(now_nanos());
    }
    match field.parse::<i64>() {
        Ok(0) => Ok(now_nanos()),
        Ok(ts) => Ok(ts),
        Err(_) => Err(EventParseError::InvalidTimestamp(field.to_string())),
    }
}

/// Decode a JSON-format event
pub fn parse_json(buf: &[u8]) -> Result<Event, EventParseError> {
    let mut event: Event = serde_json::from_slice(buf)?;
    if event.timestamp_nanos == 0 {
        event.timestamp_nanos = now_nanos();
    }
    Ok(event)
}

/// Decode every newline-separated event in a datagram
///
/// Lines starting with `{` are decoded as JSON, everything else as text.
/// Empty lines are skipped. One result is returned per non-empty line so a
/// single malformed line does not discard the rest of the datagram.
pub fn parse_datagram(buf: &[u8]) -> Vec<Result<Event, EventParseError>> {
    let text = match std::str::from_utf8(buf) {
        Ok(text) => text,
        Err(_) => return vec![Err(EventParseError::InvalidUtf8)],
    };

    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            if line.trim_start().starts_with('{') {
                parse_json(line.as_bytes())
            } else {
                parse_text(line)
            }
        })
        .collect()
}

impl Event {
    /// Encode as a text-format line (without trailing newline)
    ///
    /// Label keys and values must not contain `|`, and keys must not contain
    /// `:`; otherwise [`parse_text`] will not read the line back the same way.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 32 + self.labels.len() * 16);
        out.push_str(&self.name);
        out.push(SECTION_SEPARATOR);
        // Writing to a String cannot fail
        let _ = write!(out, "{}", self.value);
        out.push(SECTION_SEPARATOR);
        let _ = write!(out, "{}", self.timestamp_nanos);
        for (key, value) in &self.labels {
            out.push(SECTION_SEPARATOR);
            out.push_str(key);
            out.push(LABEL_SEPARATOR);
            out.push_str(value);
        }
        out
    }
}
