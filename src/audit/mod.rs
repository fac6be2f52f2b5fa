// Anomaly Detection Passes over Tool-Use Traces
//
// Every pass is a pure function from the analysis context (trace set, session
// view, tool statistics, optional session index) to a list of issues. Passes
// share no mutable state and can run in any order; the report keeps the
// configured pass order so output is stable.
//
// Reliability passes:
// - intermittency: tools that fail sometimes but not always
// - unpaired_events: PreToolUse without completion
// - oscillation: per-session success/error flip-flopping
// - session_stability: more starts than ends
//
// The tokens pass estimates context spend from argument and result previews.
//
// Compliance passes check the trace text itself: schema, timestamps, event
// ids, error message quality, tool name casing and the sessions index.

mod compliance;
mod intermittency;
mod oscillation;
mod stability;
mod tokens;
mod unpaired;

pub use compliance::{
    check_error_messages, check_event_ids, check_schema, check_sessions_index,
    check_timestamps, check_tool_names, KNOWN_TOOLS,
};
pub use intermittency::detect_intermittent_failures;
pub use oscillation::detect_oscillation;
pub use stability::detect_session_instability;
pub use tokens::{
    detect_heavy_context_loading, detect_heavy_sessions, detect_oversized_inputs,
    detect_redundant_reads, detect_token_inefficiency, detect_wasteful_tools, estimate_tokens,
    DEFAULT_TOKEN_THRESHOLD,
};
pub use unpaired::detect_unpaired_events;

use crate::config::AuditConfig;
use crate::issue::{Issue, IssueSummary};
use crate::loader::{SessionView, TraceSet};
use crate::session_index::IndexStatus;
use crate::stats::ToolStatsTracker;
use serde::{Deserialize, Serialize};

/// A single audit pass
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AuditPass {
    Intermittency,
    UnpairedEvents,
    Oscillation,
    SessionStability,
    Schema,
    Timestamps,
    EventIds,
    ErrorMessages,
    ToolNames,
    SessionsIndex,
    Tokens,
}

impl AuditPass {
    pub const ALL: [AuditPass; 11] = [
        AuditPass::Intermittency,
        AuditPass::UnpairedEvents,
        AuditPass::Oscillation,
        AuditPass::SessionStability,
        AuditPass::Schema,
        AuditPass::Timestamps,
        AuditPass::EventIds,
        AuditPass::ErrorMessages,
        AuditPass::ToolNames,
        AuditPass::SessionsIndex,
        AuditPass::Tokens,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditPass::Intermittency => "intermittency",
            AuditPass::UnpairedEvents => "unpaired_events",
            AuditPass::Oscillation => "oscillation",
            AuditPass::SessionStability => "session_stability",
            AuditPass::Schema => "schema",
            AuditPass::Timestamps => "timestamps",
            AuditPass::EventIds => "event_ids",
            AuditPass::ErrorMessages => "error_messages",
            AuditPass::ToolNames => "tool_names",
            AuditPass::SessionsIndex => "sessions_index",
            AuditPass::Tokens => "tokens",
        }
    }

    /// Run this pass against a prepared context
    pub fn run(&self, ctx: &AuditContext<'_>) -> Vec<Issue> {
        let config = ctx.config;
        match self {
            AuditPass::Intermittency => {
                detect_intermittent_failures(&ctx.tracker, config.intermittency_threshold)
            }
            AuditPass::UnpairedEvents => {
                detect_unpaired_events(&ctx.sessions, config.pairing.strategy())
            }
            AuditPass::Oscillation => detect_oscillation(&ctx.tracker, config.oscillation_threshold),
            AuditPass::SessionStability => detect_session_instability(&ctx.sessions),
            AuditPass::Schema => check_schema(ctx.trace),
            AuditPass::Timestamps => check_timestamps(ctx.trace),
            AuditPass::EventIds => check_event_ids(ctx.trace, config.strict),
            AuditPass::ErrorMessages => check_error_messages(ctx.trace),
            AuditPass::ToolNames => check_tool_names(ctx.trace),
            AuditPass::SessionsIndex => match ctx.index {
                Some(status) => check_sessions_index(status, config.strict),
                None => Vec::new(),
            },
            AuditPass::Tokens => detect_token_inefficiency(&ctx.sessions, config.token_threshold),
        }
    }
}

/// Read-only inputs shared by all passes
pub struct AuditContext<'a> {
    pub trace: &'a TraceSet,
    pub sessions: SessionView<'a>,
    pub tracker: ToolStatsTracker,
    /// Present only when a traces directory is audited
    pub index: Option<&'a IndexStatus>,
    pub config: &'a AuditConfig,
}

impl<'a> AuditContext<'a> {
    pub fn new(trace: &'a TraceSet, index: Option<&'a IndexStatus>, config: &'a AuditConfig) -> Self {
        Self {
            trace,
            sessions: trace.sessions(),
            tracker: ToolStatsTracker::from_trace(trace),
            index,
            config,
        }
    }
}

/// Whether anything was analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Completed,
    NoData,
}

/// Result of an audit run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub status: AuditStatus,
    pub total_events_analyzed: usize,
    pub passes: Vec<AuditPass>,
    pub strict_mode: bool,
    pub summary: IssueSummary,
    pub issues: Vec<Issue>,
}

impl AuditReport {
    pub fn has_critical(&self) -> bool {
        self.summary.has_critical()
    }

    /// Issues of one type
    pub fn issues_of_type<'s>(&'s self, type_name: &'s str) -> impl Iterator<Item = &'s Issue> {
        self.issues
            .iter()
            .filter(move |issue| issue.type_name() == type_name)
    }
}

/// Run the configured passes over a trace set
///
/// `index` is the sessions index status of the traces directory, or `None`
/// when a single file is audited. An empty trace yields a `no_data` report
/// with no issues, even when the index or malformed lines would have
/// produced some.
pub fn run_audit(trace: &TraceSet, index: Option<&IndexStatus>, config: &AuditConfig) -> AuditReport {
    let mut passes: Vec<AuditPass> = Vec::with_capacity(config.passes.len());
    for pass in &config.passes {
        if !passes.contains(pass) {
            passes.push(*pass);
        }
    }

    if trace.is_empty() {
        tracing::info!("no events to audit");
        return AuditReport {
            status: AuditStatus::NoData,
            total_events_analyzed: 0,
            passes,
            strict_mode: config.strict,
            summary: IssueSummary::default(),
            issues: Vec::new(),
        };
    }

    let ctx = AuditContext::new(trace, index, config);
    let mut issues = Vec::new();
    for pass in &passes {
        let found = pass.run(&ctx);
        tracing::debug!(pass = pass.as_str(), issues = found.len(), "audit pass finished");
        issues.extend(found);
    }

    let summary = IssueSummary::from_issues(&issues);
    tracing::info!(
        events = trace.events().len(),
        issues = summary.total_issues,
        critical = summary.critical,
        "audit complete"
    );

    AuditReport {
        status: AuditStatus::Completed,
        total_events_analyzed: trace.events().len(),
        passes,
        strict_mode: config.strict,
        summary,
        issues,
    }
}

#[cfg(test)]
mod tests;
