use crate::issue::{Issue, IssueKind, Severity};
use crate::loader::SessionView;
use crate::pairing::{resolve_all, MatchStrategy};

/// One warning per PreToolUse that never completed
pub fn detect_unpaired_events(sessions: &SessionView<'_>, strategy: &dyn MatchStrategy) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (session_id, result) in resolve_all(sessions, strategy) {
        if !result.unmatched_post.is_empty() {
            tracing::debug!(
                session = session_id,
                count = result.unmatched_post.len(),
                "PostToolUse without pending PreToolUse"
            );
        }

        for pre in result.unpaired_pre {
            issues.push(Issue::new(
                IssueKind::UnpairedPretooluse {
                    tool: pre.tool().to_string(),
                    session_id: session_id.to_string(),
                    timestamp: pre.timestamp.clone(),
                },
                Severity::Warning,
                format!("PreToolUse for '{}' has no matching PostToolUse", pre.tool()),
                "Tool execution may have been interrupted. Check for timeouts or crashes.",
            ));
        }
    }

    issues
}
