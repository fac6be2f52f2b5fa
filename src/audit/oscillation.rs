use super::intermittency::round_percent;
use crate::issue::{Issue, IssueKind, Severity};
use crate::stats::ToolStatsTracker;

/// Minimum observations per (session, tool) before oscillation is judged
pub const MIN_OBSERVATIONS: usize = 4;

/// Minimum absolute number of flips
pub const MIN_CHANGES: usize = 3;

/// Outcomes shown in the issue pattern
const PATTERN_LEN: usize = 10;

/// Flag (session, tool) pairs whose outcome keeps flipping
///
/// `change_rate = flips / (observations - 1)`; flagged when it exceeds
/// `threshold` and at least [`MIN_CHANGES`] flips happened.
pub fn detect_oscillation(tracker: &ToolStatsTracker, threshold: f64) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (key, stats) in tracker.per_session() {
        let observations = stats.outcomes.len();
        if observations < MIN_OBSERVATIONS {
            continue;
        }

        let changes = stats.outcome_changes();
        let change_rate = changes as f64 / (observations - 1) as f64;
        if change_rate <= threshold || changes < MIN_CHANGES {
            continue;
        }

        let pattern = stats
            .outcomes
            .iter()
            .take(PATTERN_LEN)
            .map(|outcome| outcome.as_str())
            .collect::<Vec<_>>()
            .join("->");

        issues.push(Issue::new(
            IssueKind::OscillatingErrors {
                tool: key.tool.clone(),
                session_id: key.session_id.clone(),
                pattern,
                change_rate: round_percent(change_rate),
                changes,
            },
            Severity::Warning,
            format!("Tool '{}' shows oscillating success/failure pattern", key.tool),
            "Investigate environmental factors causing inconsistent behavior.",
        ));
    }

    issues
}
