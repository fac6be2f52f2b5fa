//! Trace text compliance checks
//!
//! These passes look at how events are written rather than at what the tools
//! did: record syntax, required fields, timestamp and id formats, error
//! message quality, tool name casing and the sessions index.

use crate::event::{EventType, KNOWN_STATUSES};
use crate::issue::{Issue, IssueKind, Severity};
use crate::loader::{DiagnosticKind, TraceSet};
use crate::session_index::{IndexStatus, INDEX_FILE_NAME};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Tool names written by the event source
pub const KNOWN_TOOLS: &[&str] = &[
    "Read",
    "Write",
    "Edit",
    "Bash",
    "Glob",
    "Grep",
    "Task",
    "WebFetch",
    "WebSearch",
    "TodoWrite",
    "AskUserQuestion",
    "NotebookEdit",
    "EnterPlanMode",
    "ExitPlanMode",
];

/// Characters of an error message used to group similar failures
pub const ERROR_PREFIX_LEN: usize = 50;

/// Occurrences above which one error prefix is reported
pub const FREQUENT_ERROR_THRESHOLD: usize = 5;

fn iso8601_re() -> &'static Regex {
    static ISO8601_RE: OnceLock<Regex> = OnceLock::new();
    ISO8601_RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
            .expect("valid timestamp regex")
    })
}

fn uuid_re() -> &'static Regex {
    static UUID_RE: OnceLock<Regex> = OnceLock::new();
    UUID_RE.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("valid uuid regex")
    })
}

fn generic_error_re() -> &'static Regex {
    static GENERIC_ERROR_RE: OnceLock<Regex> = OnceLock::new();
    GENERIC_ERROR_RE.get_or_init(|| {
        Regex::new(r"^(error|unknown error|failed|exception)$").expect("valid generic error regex")
    })
}

/// Malformed lines, unknown event types, missing fields and odd statuses
pub fn check_schema(trace: &TraceSet) -> Vec<Issue> {
    let mut issues = Vec::new();

    for diagnostic in trace.malformed_lines() {
        let error = match &diagnostic.kind {
            DiagnosticKind::InvalidJson { error } => error.clone(),
            DiagnosticKind::InvalidUtf8 => "invalid UTF-8".to_string(),
            _ => continue,
        };
        issues.push(Issue::new(
            IssueKind::InvalidJson {
                file: diagnostic.source.clone(),
                line: diagnostic.line,
                error,
            },
            Severity::Critical,
            format!(
                "Invalid JSON at line {} in {}",
                diagnostic.line, diagnostic.source
            ),
            "Fix the malformed JSON in the trace file.",
        ));
    }

    let known_types = EventType::KNOWN
        .iter()
        .map(EventType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    for event in trace.events() {
        let file = event.origin.source.clone();
        let line = event.origin.line;

        if !event.event_type.is_known() {
            issues.push(Issue::new(
                IssueKind::InvalidEventType {
                    event_type: event.event_type.to_string(),
                    file,
                    line,
                },
                Severity::Warning,
                format!("Unknown event type: '{}'", event.event_type),
                format!("Use one of: {known_types}"),
            ));
            continue;
        }

        let missing = event.missing_required_fields();
        if !missing.is_empty() {
            issues.push(Issue::new(
                IssueKind::MissingRequiredFields {
                    event_type: event.event_type.to_string(),
                    missing_fields: missing.iter().map(|f| f.to_string()).collect(),
                    file: file.clone(),
                    line,
                },
                Severity::Warning,
                format!("Event missing required fields: {missing:?}"),
                format!(
                    "Ensure all required fields are present: {:?}",
                    event.event_type.required_fields()
                ),
            ));
        }

        if let Some(status) = event.status.as_deref().filter(|_| event.has_unknown_status()) {
            issues.push(Issue::new(
                IssueKind::InvalidStatusValue {
                    status: status.to_string(),
                    file,
                    line,
                },
                Severity::Info,
                format!("Non-standard status value: '{status}'"),
                format!("Use one of: {}", KNOWN_STATUSES.join(", ")),
            ));
        }
    }

    issues
}

/// Timestamps that are not ISO-8601
pub fn check_timestamps(trace: &TraceSet) -> Vec<Issue> {
    let pattern = iso8601_re();

    trace
        .events()
        .iter()
        .filter(|event| !event.timestamp.is_empty() && !pattern.is_match(&event.timestamp))
        .map(|event| {
            Issue::new(
                IssueKind::InvalidTimestampFormat {
                    timestamp: event.timestamp.clone(),
                    file: event.origin.source.clone(),
                    line: event.origin.line,
                },
                Severity::Info,
                format!("Timestamp '{}' doesn't match ISO8601 format", event.timestamp),
                "Use format: YYYY-MM-DDTHH:MM:SS.sssZ",
            )
        })
        .collect()
}

/// Duplicate event ids, and non-UUID ids in strict mode
///
/// Duplicates are reported on every repeat, not deduplicated.
pub fn check_event_ids(trace: &TraceSet, strict: bool) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for event in trace.events() {
        let Some(event_id) = event.event_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        let file = &event.origin.source;

        if strict && !uuid_re().is_match(event_id) {
            issues.push(Issue::new(
                IssueKind::NonUuidEventId {
                    event_id: event_id.to_string(),
                    file: file.clone(),
                },
                Severity::Info,
                format!("Event ID '{event_id}' is not a standard UUID"),
                "Use UUID format for event IDs.",
            ));
        }

        if !seen.insert(event_id) {
            issues.push(Issue::new(
                IssueKind::DuplicateEventId {
                    event_id: event_id.to_string(),
                    file: file.clone(),
                },
                Severity::Warning,
                format!("Duplicate event_id: '{event_id}'"),
                "Ensure each event has a unique ID.",
            ));
        }
    }

    issues
}

/// Empty, generic and frequently repeated error messages
pub fn check_error_messages(trace: &TraceSet) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut by_prefix: BTreeMap<String, usize> = BTreeMap::new();

    for event in trace.events().iter().filter(|event| event.is_error()) {
        let message = event.error_message.as_deref().unwrap_or_default();
        let file = event.origin.source.clone();

        if message.trim().is_empty() {
            issues.push(Issue::new(
                IssueKind::EmptyErrorMessage {
                    event_type: event.event_type.to_string(),
                    tool: event.tool_name.clone(),
                    file,
                },
                Severity::Warning,
                "Error event has no error_message",
                "Always include descriptive error messages.",
            ));
            continue;
        }

        if generic_error_re().is_match(&message.to_lowercase()) {
            issues.push(Issue::new(
                IssueKind::GenericErrorMessage {
                    error_message: message.to_string(),
                    file,
                },
                Severity::Info,
                format!("Generic error message: '{message}'"),
                "Use descriptive error messages with context.",
            ));
        }

        *by_prefix.entry(error_prefix(message)).or_insert(0) += 1;
    }

    for (prefix, count) in by_prefix {
        if count > FREQUENT_ERROR_THRESHOLD {
            issues.push(Issue::new(
                IssueKind::FrequentError {
                    error_pattern: prefix.clone(),
                    occurrence_count: count,
                },
                Severity::Warning,
                format!("Error pattern occurs {count} times: '{prefix}...'"),
                "Investigate root cause of recurring error.",
            ));
        }
    }

    issues
}

/// Case-folded message prefix used as a "same failure" key
pub fn error_prefix(message: &str) -> String {
    message
        .chars()
        .take(ERROR_PREFIX_LEN)
        .collect::<String>()
        .to_lowercase()
}

/// Tool names that differ from a known tool only by case
pub fn check_tool_names(trace: &TraceSet) -> Vec<Issue> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in trace.events().iter().filter_map(|e| e.tool_name.as_deref()) {
        *counts.entry(name).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter(|(name, _)| !KNOWN_TOOLS.contains(name))
        .filter_map(|(name, count)| {
            let expected = KNOWN_TOOLS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(name))?;
            Some(Issue::new(
                IssueKind::ToolNameCaseMismatch {
                    found: name.to_string(),
                    expected: expected.to_string(),
                    count,
                },
                Severity::Info,
                format!("Tool name '{name}' should be '{expected}'"),
                "Use consistent tool name casing.",
            ))
        })
        .collect()
}

/// Problems with the `sessions.json` side file
pub fn check_sessions_index(status: &IndexStatus, strict: bool) -> Vec<Issue> {
    match status {
        IndexStatus::Missing => vec![Issue::new(
            IssueKind::MissingSessionsIndex,
            Severity::Warning,
            "Sessions index file not found",
            format!("Create {INDEX_FILE_NAME} to track session metadata."),
        )],
        IndexStatus::Empty => vec![Issue::new(
            IssueKind::EmptySessionsIndex,
            Severity::Warning,
            "Sessions index file is empty",
            "Sessions will be indexed automatically on next event.",
        )],
        IndexStatus::Invalid { reason } => vec![Issue::new(
            IssueKind::InvalidSessionsIndex {
                error: reason.clone(),
            },
            Severity::Critical,
            "Sessions index is not valid JSON",
            format!("Fix the {INDEX_FILE_NAME} file format."),
        )],
        IndexStatus::InvalidStructure => vec![Issue::new(
            IssueKind::InvalidSessionsIndexStructure,
            Severity::Warning,
            "Sessions index should be a JSON object",
            "Use object format: {\"session_id\": {metadata}}",
        )],
        IndexStatus::Loaded { index } if strict => index
            .sessions
            .iter()
            .filter(|meta| !meta.missing.is_empty())
            .map(|meta| {
                Issue::new(
                    IssueKind::IncompleteSessionMetadata {
                        session_id: meta.session_id.clone(),
                        missing: meta.missing.clone(),
                    },
                    Severity::Info,
                    format!(
                        "Session '{}' missing metadata: {:?}",
                        meta.session_id, meta.missing
                    ),
                    "Include started_at and event_count in session metadata.",
                )
            })
            .collect(),
        IndexStatus::Loaded { .. } => Vec::new(),
    }
}
