//! Audit issues and severity
//!
//! Every audit pass emits [`Issue`] values: a typed evidence payload
//! ([`IssueKind`]), a severity, a message and a remediation hint. Issues are
//! plain data and never change after creation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity, ordered `Info < Warning < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence carried by an issue, tagged by issue type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueKind {
    IntermittentToolFailure {
        tool: String,
        success_count: u64,
        error_count: u64,
        /// Percent, one decimal
        error_rate: f64,
        sessions_affected: usize,
    },
    UnpairedPretooluse {
        tool: String,
        session_id: String,
        timestamp: String,
    },
    OscillatingErrors {
        tool: String,
        session_id: String,
        /// First ten outcomes joined by `->`
        pattern: String,
        /// Percent, one decimal
        change_rate: f64,
        changes: usize,
    },
    SessionInstability {
        session_id: String,
        starts: u64,
        ends: u64,
    },
    InvalidJson {
        file: String,
        line: usize,
        error: String,
    },
    InvalidEventType {
        event_type: String,
        file: String,
        line: usize,
    },
    MissingRequiredFields {
        event_type: String,
        missing_fields: Vec<String>,
        file: String,
        line: usize,
    },
    InvalidStatusValue {
        status: String,
        file: String,
        line: usize,
    },
    InvalidTimestampFormat {
        timestamp: String,
        file: String,
        line: usize,
    },
    NonUuidEventId {
        event_id: String,
        file: String,
    },
    DuplicateEventId {
        event_id: String,
        file: String,
    },
    EmptyErrorMessage {
        event_type: String,
        tool: Option<String>,
        file: String,
    },
    GenericErrorMessage {
        error_message: String,
        file: String,
    },
    FrequentError {
        error_pattern: String,
        occurrence_count: usize,
    },
    ToolNameCaseMismatch {
        found: String,
        expected: String,
        count: usize,
    },
    MissingSessionsIndex,
    EmptySessionsIndex,
    InvalidSessionsIndex {
        error: String,
    },
    InvalidSessionsIndexStructure,
    IncompleteSessionMetadata {
        session_id: String,
        missing: Vec<String>,
    },
    HighTokenSession {
        session_id: String,
        total_tokens: u64,
        average_tokens: u64,
    },
    OversizedInput {
        session_id: String,
        tool: String,
        tokens: u64,
        threshold: u64,
        timestamp: String,
    },
    RedundantReads {
        session_id: String,
        read_count: usize,
        /// First 100 characters of the repeated input
        args_preview: String,
    },
    InefficientToolUsage {
        tool: String,
        total_calls: u64,
        /// Percent, one decimal
        error_rate: f64,
        tokens_per_call: u64,
    },
    HeavyContextLoading {
        session_id: String,
        read_count: usize,
        estimated_tokens: u64,
    },
}

impl IssueKind {
    /// Wire name of the issue type
    pub fn type_name(&self) -> &'static str {
        match self {
            IssueKind::IntermittentToolFailure { .. } => "intermittent_tool_failure",
            IssueKind::UnpairedPretooluse { .. } => "unpaired_pretooluse",
            IssueKind::OscillatingErrors { .. } => "oscillating_errors",
            IssueKind::SessionInstability { .. } => "session_instability",
            IssueKind::InvalidJson { .. } => "invalid_json",
            IssueKind::InvalidEventType { .. } => "invalid_event_type",
            IssueKind::MissingRequiredFields { .. } => "missing_required_fields",
            IssueKind::InvalidStatusValue { .. } => "invalid_status_value",
            IssueKind::InvalidTimestampFormat { .. } => "invalid_timestamp_format",
            IssueKind::NonUuidEventId { .. } => "non_uuid_event_id",
            IssueKind::DuplicateEventId { .. } => "duplicate_event_id",
            IssueKind::EmptyErrorMessage { .. } => "empty_error_message",
            IssueKind::GenericErrorMessage { .. } => "generic_error_message",
            IssueKind::FrequentError { .. } => "frequent_error",
            IssueKind::ToolNameCaseMismatch { .. } => "tool_name_case_mismatch",
            IssueKind::MissingSessionsIndex => "missing_sessions_index",
            IssueKind::EmptySessionsIndex => "empty_sessions_index",
            IssueKind::InvalidSessionsIndex { .. } => "invalid_sessions_index",
            IssueKind::InvalidSessionsIndexStructure => "invalid_sessions_index_structure",
            IssueKind::IncompleteSessionMetadata { .. } => "incomplete_session_metadata",
            IssueKind::HighTokenSession { .. } => "high_token_session",
            IssueKind::OversizedInput { .. } => "oversized_input",
            IssueKind::RedundantReads { .. } => "redundant_reads",
            IssueKind::InefficientToolUsage { .. } => "inefficient_tool_usage",
            IssueKind::HeavyContextLoading { .. } => "heavy_context_loading",
        }
    }

    /// Tool the issue refers to, if any
    pub fn tool(&self) -> Option<&str> {
        match self {
            IssueKind::IntermittentToolFailure { tool, .. }
            | IssueKind::UnpairedPretooluse { tool, .. }
            | IssueKind::OscillatingErrors { tool, .. }
            | IssueKind::OversizedInput { tool, .. }
            | IssueKind::InefficientToolUsage { tool, .. } => Some(tool),
            IssueKind::EmptyErrorMessage { tool, .. } => tool.as_deref(),
            IssueKind::ToolNameCaseMismatch { found, .. } => Some(found),
            _ => None,
        }
    }

    /// Session the issue refers to, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            IssueKind::UnpairedPretooluse { session_id, .. }
            | IssueKind::OscillatingErrors { session_id, .. }
            | IssueKind::SessionInstability { session_id, .. }
            | IssueKind::IncompleteSessionMetadata { session_id, .. }
            | IssueKind::HighTokenSession { session_id, .. }
            | IssueKind::OversizedInput { session_id, .. }
            | IssueKind::RedundantReads { session_id, .. }
            | IssueKind::HeavyContextLoading { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}

/// A single audit finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    #[serde(flatten)]
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub remediation: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        message: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// Severity-partitioned issue counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub total_issues: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl IssueSummary {
    pub fn from_issues(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut summary, issue| {
            summary.total_issues += 1;
            match issue.severity {
                Severity::Critical => summary.critical += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
            summary
        })
    }

    pub fn has_critical(&self) -> bool {
        self.critical > 0
    }
}

/// Highest severity present, if any
pub fn max_severity(issues: &[Issue]) -> Option<Severity> {
    issues.iter().map(|issue| issue.severity).max()
}
