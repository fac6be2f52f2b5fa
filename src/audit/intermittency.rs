use crate::issue::{Issue, IssueKind, Severity};
use crate::stats::ToolStatsTracker;

/// Error rate at or above which an intermittent tool is critical
pub const CRITICAL_ERROR_RATE: f64 = 0.3;

/// Minimum completed calls before a tool is judged
pub const MIN_CALLS: u64 = 2;

/// Flag tools that fail sometimes but not always
///
/// A tool qualifies when `threshold <= error_rate < 1.0`. Tools failing on
/// every call are hard failures and are left to other reporting.
pub fn detect_intermittent_failures(tracker: &ToolStatsTracker, threshold: f64) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (tool, stats) in tracker.tools() {
        if stats.calls < MIN_CALLS {
            continue;
        }

        let rate = stats.error_rate();
        if rate < threshold || rate >= 1.0 {
            continue;
        }

        let severity = if rate >= CRITICAL_ERROR_RATE {
            Severity::Critical
        } else {
            Severity::Warning
        };

        issues.push(Issue::new(
            IssueKind::IntermittentToolFailure {
                tool: tool.clone(),
                success_count: stats.successes,
                error_count: stats.errors,
                error_rate: round_percent(rate),
                sessions_affected: stats.sessions.len(),
            },
            severity,
            format!(
                "Tool '{}' has {:.1}% failure rate ({}/{} calls)",
                tool,
                rate * 100.0,
                stats.errors,
                stats.calls
            ),
            format!(
                "Investigate why '{tool}' fails intermittently. Check input patterns and error messages."
            ),
        ));
    }

    issues
}

/// Ratio as a percentage with one decimal
pub(crate) fn round_percent(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}
