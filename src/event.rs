//! Trace event model
//!
//! One line of a session log deserializes into one [`Event`]. The event type
//! is a closed set with an explicit [`EventType::Other`] arm; the status is an
//! open token that is only ever compared against `"error"`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Session identifier used when an event carries none
pub const UNKNOWN_SESSION: &str = "unknown";

/// Tool name used when a tool event carries none
pub const UNKNOWN_TOOL: &str = "unknown";

/// Status vocabulary written by the event source
pub const KNOWN_STATUSES: &[&str] = &[
    "pending",
    "success",
    "error",
    "started",
    "ended",
    "completed",
    "unknown",
    "submitted",
    "compacting",
    "notified",
];

/// Kind of occurrence recorded by the event source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    SessionStart,
    SessionEnd,
    PreToolUse,
    PostToolUse,
    Stop,
    SubagentStop,
    UserPromptSubmit,
    PreCompact,
    Notification,
    /// Anything outside the closed set, kept verbatim
    Other(String),
}

impl EventType {
    /// All known event types, in lifecycle order
    pub const KNOWN: [EventType; 9] = [
        EventType::SessionStart,
        EventType::SessionEnd,
        EventType::PreToolUse,
        EventType::PostToolUse,
        EventType::Stop,
        EventType::SubagentStop,
        EventType::UserPromptSubmit,
        EventType::PreCompact,
        EventType::Notification,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventType::SessionStart => "SessionStart",
            EventType::SessionEnd => "SessionEnd",
            EventType::PreToolUse => "PreToolUse",
            EventType::PostToolUse => "PostToolUse",
            EventType::Stop => "Stop",
            EventType::SubagentStop => "SubagentStop",
            EventType::UserPromptSubmit => "UserPromptSubmit",
            EventType::PreCompact => "PreCompact",
            EventType::Notification => "Notification",
            EventType::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }

    /// Pre/PostToolUse
    pub fn is_tool_event(&self) -> bool {
        matches!(self, EventType::PreToolUse | EventType::PostToolUse)
    }

    /// SessionEnd or Stop, the two ways a session is closed
    pub fn is_session_close(&self) -> bool {
        matches!(self, EventType::SessionEnd | EventType::Stop)
    }

    /// Fields the event source is expected to write for this type
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            EventType::SessionStart
            | EventType::SessionEnd
            | EventType::UserPromptSubmit
            | EventType::PreCompact
            | EventType::Notification => {
                &["event_id", "session_id", "timestamp", "event_type", "status"]
            }
            EventType::PreToolUse => &[
                "event_id",
                "session_id",
                "timestamp",
                "event_type",
                "tool_name",
            ],
            EventType::PostToolUse => &[
                "event_id",
                "session_id",
                "timestamp",
                "event_type",
                "tool_name",
                "status",
            ],
            EventType::Stop | EventType::SubagentStop => {
                &["event_id", "session_id", "timestamp", "event_type"]
            }
            EventType::Other(_) => &[],
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SessionStart" => EventType::SessionStart,
            "SessionEnd" => EventType::SessionEnd,
            "PreToolUse" => EventType::PreToolUse,
            "PostToolUse" => EventType::PostToolUse,
            "Stop" => EventType::Stop,
            "SubagentStop" => EventType::SubagentStop,
            "UserPromptSubmit" => EventType::UserPromptSubmit,
            "PreCompact" => EventType::PreCompact,
            "Notification" => EventType::Notification,
            _ => EventType::Other(raw),
        }
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an event was read from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventOrigin {
    /// Source name (file name for traces on disk)
    pub source: String,
    /// 1-based line number
    pub line: usize,
}

/// One observed occurrence in a tool-use session log
///
/// Only `timestamp` and `event_type` must be well-typed. Optional text fields
/// holding numbers or booleans keep their JSON text; `null`, arrays and
/// objects are treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,

    /// ISO-8601; sorts lexicographically with wall-clock order
    pub timestamp: String,

    pub event_type: EventType,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,

    /// Milliseconds; non-numeric values are treated as absent
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_ms: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub args_preview: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub result_preview: Option<String>,

    #[serde(skip)]
    pub origin: EventOrigin,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

impl Event {
    /// Create a minimal event (used by tests and synthetic traces)
    pub fn new(session_id: &str, timestamp: &str, event_type: EventType) -> Self {
        Self {
            event_id: None,
            session_id: Some(session_id.to_string()),
            timestamp: timestamp.to_string(),
            event_type,
            tool_name: None,
            status: None,
            duration_ms: None,
            error_message: None,
            args_preview: None,
            result_preview: None,
            origin: EventOrigin::default(),
        }
    }

    /// Builder-style tool name
    pub fn with_tool(mut self, tool_name: &str) -> Self {
        self.tool_name = Some(tool_name.to_string());
        self
    }

    /// Builder-style status
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Builder-style event id
    pub fn with_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    /// Builder-style error message
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    /// Builder-style duration
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Builder-style argument preview
    pub fn with_args_preview(mut self, preview: &str) -> Self {
        self.args_preview = Some(preview.to_string());
        self
    }

    /// Builder-style result preview
    pub fn with_result_preview(mut self, preview: &str) -> Self {
        self.result_preview = Some(preview.to_string());
        self
    }

    /// Session identifier, or "unknown"
    pub fn session(&self) -> &str {
        self.session_id.as_deref().unwrap_or(UNKNOWN_SESSION)
    }

    /// Tool name, or "unknown"
    pub fn tool(&self) -> &str {
        self.tool_name.as_deref().unwrap_or(UNKNOWN_TOOL)
    }

    /// The only status comparison that drives analysis
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    /// Status is present and outside the known vocabulary
    pub fn has_unknown_status(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| !KNOWN_STATUSES.contains(&status))
    }

    /// Timestamp truncated to whole seconds (`YYYY-MM-DDTHH:MM:SS`)
    pub fn timestamp_second(&self) -> &str {
        self.timestamp.get(..19).unwrap_or(&self.timestamp)
    }

    /// Names of the required fields for this event type that are absent
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        self.event_type
            .required_fields()
            .iter()
            .copied()
            .filter(|field| match *field {
                "event_id" => self.event_id.is_none(),
                "session_id" => self.session_id.is_none(),
                "tool_name" => self.tool_name.is_none(),
                "status" => self.status.is_none(),
                _ => false,
            })
            .collect()
    }
}
