use crate::event::EventType;
use crate::issue::{Issue, IssueKind, Severity};
use crate::loader::SessionView;

/// Sessions started more than once without being closed
///
/// Ends are SessionEnd and Stop events. One unmatched start is tolerated:
/// it is the session still running.
pub fn detect_session_instability(sessions: &SessionView<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (session_id, session) in sessions {
        let (starts, ends) = session
            .events
            .iter()
            .fold((0u64, 0u64), |(starts, ends), event| match event.event_type {
                EventType::SessionStart => (starts + 1, ends),
                ref close if close.is_session_close() => (starts, ends + 1),
                _ => (starts, ends),
            });

        if starts > ends + 1 {
            issues.push(Issue::new(
                IssueKind::SessionInstability {
                    session_id: session_id.to_string(),
                    starts,
                    ends,
                },
                Severity::Info,
                format!("Session has {starts} starts but only {ends} ends"),
                "Session may have crashed or been interrupted multiple times.",
            ));
        }
    }

    issues
}
