//! Parsed voice capture payload.
//!
//! # Invariants
//! - `title` is trimmed, whitespace-collapsed and never empty.
//! - Unparseable `dueDate` / `priority` values are dropped, not errors.

use crate::model::todo::TodoPriority;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const KEY_TITLE: &str = "title";
const KEY_DUE_DATE: &str = "dueDate";
const KEY_PRIORITY: &str = "priority";

/// Failures when turning a parse payload into a capture result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureParseError {
    /// Title absent or blank; the user said nothing usable.
    MissingTitle,
    NotAnObject,
    InvalidJson(String),
}

impl Display for CaptureParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "capture result has no title"),
            Self::NotAnObject => write!(f, "capture result must be a JSON object"),
            Self::InvalidJson(message) => write!(f, "capture result is not valid JSON: {message}"),
        }
    }
}

impl Error for CaptureParseError {}

/// One successful voice capture, consumed immediately to build a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCaptureResult {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TodoPriority>,
}

impl VoiceCaptureResult {
    /// Builds a result from raw parser fields.
    pub fn from_fields(
        title: &str,
        due_date: Option<&str>,
        priority: Option<&str>,
    ) -> Result<Self, CaptureParseError> {
        let title = normalize_title(title).ok_or(CaptureParseError::MissingTitle)?;
        Ok(Self {
            title,
            due_date: due_date.and_then(parse_due_date),
            priority: priority.and_then(TodoPriority::parse_loose),
        })
    }

    /// Builds a result from a `{title, dueDate?, priority?}` map.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, CaptureParseError> {
        let title = map
            .get(KEY_TITLE)
            .and_then(Value::as_str)
            .ok_or(CaptureParseError::MissingTitle)?;
        Self::from_fields(
            title,
            map.get(KEY_DUE_DATE).and_then(Value::as_str),
            map.get(KEY_PRIORITY).and_then(Value::as_str),
        )
    }

    /// Parses a JSON object payload.
    pub fn from_json_str(raw: &str) -> Result<Self, CaptureParseError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| CaptureParseError::InvalidJson(err.to_string()))?;
        match value {
            Value::Object(map) => Self::from_map(&map),
            _ => Err(CaptureParseError::NotAnObject),
        }
    }
}

fn normalize_title(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept).
fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|value| value.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::{CaptureParseError, VoiceCaptureResult};
    use crate::model::todo::TodoPriority;
    use chrono::NaiveDate;

    #[test]
    fn parses_full_payload() {
        let result = VoiceCaptureResult::from_json_str(
            r#"{"title":"  buy   oat milk ","dueDate":"2026-10-20","priority":"HIGH"}"#,
        )
        .expect("valid payload");
        assert_eq!(result.title, "buy oat milk");
        assert_eq!(
            result.due_date,
            NaiveDate::from_ymd_opt(2026, 10, 20)
        );
        assert_eq!(result.priority, Some(TodoPriority::High));
    }

    #[test]
    fn accepts_rfc3339_due_date() {
        let result = VoiceCaptureResult::from_fields(
            "call mom",
            Some("2026-10-18T09:30:00+02:00"),
            None,
        )
        .expect("valid fields");
        assert_eq!(result.due_date, NaiveDate::from_ymd_opt(2026, 10, 18));
    }

    #[test]
    fn drops_unparseable_optional_fields() {
        let result =
            VoiceCaptureResult::from_fields("stretch", Some("next tuesday"), Some("urgent"))
                .expect("title is enough");
        assert_eq!(result.due_date, None);
        assert_eq!(result.priority, None);
    }

    #[test]
    fn blank_title_is_missing() {
        assert_eq!(
            VoiceCaptureResult::from_json_str(r#"{"title":"   "}"#),
            Err(CaptureParseError::MissingTitle)
        );
        assert_eq!(
            VoiceCaptureResult::from_json_str(r#"{"priority":"low"}"#),
            Err(CaptureParseError::MissingTitle)
        );
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert_eq!(
            VoiceCaptureResult::from_json_str(r#"["title"]"#),
            Err(CaptureParseError::NotAnObject)
        );
        assert!(matches!(
            VoiceCaptureResult::from_json_str("{"),
            Err(CaptureParseError::InvalidJson(_))
        ));
    }
}
