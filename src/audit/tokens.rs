use super::intermittency::round_percent;
use crate::event::{Event, EventType};
use crate::issue::{Issue, IssueKind, Severity};
use crate::loader::SessionView;
use std::collections::BTreeMap;

/// Estimated input tokens above which a single call is oversized
pub const DEFAULT_TOKEN_THRESHOLD: u64 = 5000;

/// A session is heavy when it uses more than this multiple of the average
pub const HEAVY_SESSION_FACTOR: f64 = 2.0;

/// Identical read operations tolerated per session
pub const MAX_REPEATED_READS: usize = 2;

/// Tools whose repeated identical input counts as a redundant read
pub const READ_TOOLS: &[&str] = &["Read", "Glob", "Grep"];

/// Calls required before a tool's token efficiency is judged
pub const MIN_EFFICIENCY_CALLS: u64 = 3;

/// Error rate above which token spend on a tool is wasted
pub const WASTEFUL_ERROR_RATE: f64 = 0.3;

/// Tokens per call above which a failing tool is flagged
pub const WASTEFUL_TOKENS_PER_CALL: f64 = 1000.0;

/// Leading events inspected for context loading
pub const EARLY_WINDOW: usize = 20;

/// Read calls tolerated inside the leading window
pub const MAX_EARLY_READS: usize = 5;

/// Rough token estimate: four characters per token
pub fn estimate_tokens(text: Option<&str>) -> u64 {
    text.map_or(0, |text| (text.chars().count() / 4) as u64)
}

fn input_tokens(event: &Event) -> u64 {
    estimate_tokens(event.args_preview.as_deref())
}

fn output_tokens(event: &Event) -> u64 {
    estimate_tokens(event.result_preview.as_deref())
}

/// Token-efficiency findings over estimated preview sizes
///
/// Runs the session, per-call, redundant read, per-tool and early context
/// checks in that order. Estimates come from `args_preview` (input) and
/// `result_preview` (output); events without previews count as zero tokens.
pub fn detect_token_inefficiency(sessions: &SessionView<'_>, threshold: u64) -> Vec<Issue> {
    let mut issues = detect_heavy_sessions(sessions);
    issues.extend(detect_oversized_inputs(sessions, threshold));
    issues.extend(detect_redundant_reads(sessions));
    issues.extend(detect_wasteful_tools(sessions));
    issues.extend(detect_heavy_context_loading(sessions));
    issues
}

/// Sessions spending more than twice the average estimated tokens
pub fn detect_heavy_sessions(sessions: &SessionView<'_>) -> Vec<Issue> {
    if sessions.is_empty() {
        return Vec::new();
    }

    let totals: Vec<(&str, u64)> = sessions
        .iter()
        .map(|(id, session)| {
            let total = session
                .events
                .iter()
                .map(|event| match event.event_type {
                    EventType::PreToolUse => input_tokens(event),
                    EventType::PostToolUse => output_tokens(event),
                    _ => 0,
                })
                .sum::<u64>();
            (*id, total)
        })
        .collect();

    let average = totals.iter().map(|(_, total)| *total as f64).sum::<f64>() / totals.len() as f64;

    totals
        .into_iter()
        .filter(|(_, total)| *total as f64 > average * HEAVY_SESSION_FACTOR)
        .map(|(session_id, total)| {
            let average = average as u64;
            Issue::new(
                IssueKind::HighTokenSession {
                    session_id: session_id.to_string(),
                    total_tokens: total,
                    average_tokens: average,
                },
                Severity::Warning,
                format!("Session uses {total} tokens (2x above average {average})"),
                "Review session for unnecessary tool calls or oversized inputs.",
            )
        })
        .collect()
}

/// PreToolUse events whose estimated input exceeds `threshold`
pub fn detect_oversized_inputs(sessions: &SessionView<'_>, threshold: u64) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (session_id, session) in sessions {
        for event in &session.events {
            if event.event_type != EventType::PreToolUse {
                continue;
            }
            let tokens = input_tokens(event);
            if tokens <= threshold {
                continue;
            }
            let tool = event.tool();
            issues.push(Issue::new(
                IssueKind::OversizedInput {
                    session_id: session_id.to_string(),
                    tool: tool.to_string(),
                    tokens,
                    threshold,
                    timestamp: event.timestamp.clone(),
                },
                Severity::Warning,
                format!("Tool '{tool}' received ~{tokens} tokens (threshold: {threshold})"),
                format!("Consider reducing input size for '{tool}' calls."),
            ));
        }
    }

    issues
}

/// Read, Glob and Grep calls repeated with identical input in one session
///
/// Calls without an `args_preview` are skipped: an absent preview says
/// nothing about which file was read.
pub fn detect_redundant_reads(sessions: &SessionView<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (session_id, session) in sessions {
        let mut reads: BTreeMap<&str, usize> = BTreeMap::new();
        for event in &session.events {
            if event.event_type != EventType::PreToolUse || !READ_TOOLS.contains(&event.tool()) {
                continue;
            }
            if let Some(args) = event.args_preview.as_deref() {
                *reads.entry(args).or_default() += 1;
            }
        }

        for (args, count) in reads {
            if count <= MAX_REPEATED_READS {
                continue;
            }
            issues.push(Issue::new(
                IssueKind::RedundantReads {
                    session_id: session_id.to_string(),
                    read_count: count,
                    args_preview: args.chars().take(100).collect(),
                },
                Severity::Info,
                format!("Same read operation performed {count} times in session"),
                "Consider caching file contents or reducing redundant reads.",
            ));
        }
    }

    issues
}

#[derive(Default)]
struct ToolTokens {
    calls: u64,
    errors: u64,
    tokens: u64,
}

/// Tools that fail often while spending many tokens per call
///
/// Calls are PreToolUse events; errors are PostToolUse events with status
/// `error`. Aggregated across all sessions.
pub fn detect_wasteful_tools(sessions: &SessionView<'_>) -> Vec<Issue> {
    let mut usage: BTreeMap<&str, ToolTokens> = BTreeMap::new();

    for event in sessions.values().flat_map(|session| session.events.iter()) {
        match event.event_type {
            EventType::PreToolUse => {
                let entry = usage.entry(event.tool()).or_default();
                entry.calls += 1;
                entry.tokens += input_tokens(event);
            }
            EventType::PostToolUse => {
                let entry = usage.entry(event.tool()).or_default();
                entry.tokens += output_tokens(event);
                if event.is_error() {
                    entry.errors += 1;
                }
            }
            _ => {}
        }
    }

    let mut issues = Vec::new();
    for (tool, stats) in usage {
        if stats.calls < MIN_EFFICIENCY_CALLS {
            continue;
        }
        let error_rate = stats.errors as f64 / stats.calls as f64;
        let tokens_per_call = stats.tokens as f64 / stats.calls as f64;
        if error_rate <= WASTEFUL_ERROR_RATE || tokens_per_call <= WASTEFUL_TOKENS_PER_CALL {
            continue;
        }

        let per_call = tokens_per_call as u64;
        issues.push(Issue::new(
            IssueKind::InefficientToolUsage {
                tool: tool.to_string(),
                total_calls: stats.calls,
                error_rate: round_percent(error_rate),
                tokens_per_call: per_call,
            },
            Severity::Warning,
            format!(
                "Tool '{}' has {:.1}% error rate with ~{} tokens/call",
                tool,
                error_rate * 100.0,
                per_call
            ),
            format!("Reduce token waste by fixing errors in '{tool}' usage patterns."),
        ));
    }

    issues
}

/// Sessions opening with a burst of Read calls
pub fn detect_heavy_context_loading(sessions: &SessionView<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (session_id, session) in sessions {
        let early_reads: Vec<&Event> = session
            .events
            .iter()
            .take(EARLY_WINDOW)
            .copied()
            .filter(|event| event.event_type == EventType::PreToolUse && event.tool() == "Read")
            .collect();

        if early_reads.len() <= MAX_EARLY_READS {
            continue;
        }

        let count = early_reads.len();
        let tokens: u64 = early_reads.iter().map(|event| input_tokens(event)).sum();
        issues.push(Issue::new(
            IssueKind::HeavyContextLoading {
                session_id: session_id.to_string(),
                read_count: count,
                estimated_tokens: tokens,
            },
            Severity::Info,
            format!("Session starts with {count} Read operations (~{tokens} tokens)"),
            "Consider lazy loading or reducing initial context.",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TraceSet;

    fn at(second: usize) -> String {
        format!("2025-01-01T10:{:02}:{:02}Z", second / 60, second % 60)
    }

    fn pre(session: &str, second: usize, tool: &str, args: &str) -> Event {
        Event::new(session, &at(second), EventType::PreToolUse)
            .with_tool(tool)
            .with_args_preview(args)
    }

    fn post(session: &str, second: usize, tool: &str, status: &str, result: &str) -> Event {
        Event::new(session, &at(second), EventType::PostToolUse)
            .with_tool(tool)
            .with_status(status)
            .with_result_preview(result)
    }

    fn text(tokens: usize) -> String {
        "abcd".repeat(tokens)
    }

    #[test]
    fn test_estimate_tokens_is_chars_over_four() {
        assert_eq!(estimate_tokens(None), 0);
        assert_eq!(estimate_tokens(Some("")), 0);
        assert_eq!(estimate_tokens(Some("abc")), 0);
        assert_eq!(estimate_tokens(Some("abcdefghi")), 2);
        assert_eq!(estimate_tokens(Some("éééé")), 1);
    }

    #[test]
    fn test_high_token_session() {
        let mut events = Vec::new();
        for (i, session) in ["a", "b", "c", "d"].iter().enumerate() {
            events.push(pre(session, i, "Bash", &text(10)));
        }
        events.push(post("d", 10, "Bash", "success", &text(200)));
        let trace = TraceSet::from_events(events);

        // totals 10, 10, 10, 210; average 60
        let issues = detect_heavy_sessions(&trace.sessions());
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].kind,
            IssueKind::HighTokenSession {
                session_id: "d".to_string(),
                total_tokens: 210,
                average_tokens: 60,
            }
        );
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].message, "Session uses 210 tokens (2x above average 60)");
    }

    #[test]
    fn test_single_session_is_never_heavy() {
        let trace = TraceSet::from_events(vec![pre("solo", 0, "Read", &text(9000))]);
        assert!(detect_heavy_sessions(&trace.sessions()).is_empty());
    }

    #[test]
    fn test_oversized_input_above_threshold_only() {
        let trace = TraceSet::from_events(vec![
            pre("s1", 0, "Write", &text(5001)),
            pre("s1", 1, "Write", &text(5000)),
            post("s1", 2, "Write", "success", &text(9000)),
        ]);
        let issues = detect_oversized_inputs(&trace.sessions(), DEFAULT_TOKEN_THRESHOLD);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind.tool(), Some("Write"));
        assert_eq!(issues[0].kind.session_id(), Some("s1"));
        assert_eq!(
            issues[0].message,
            "Tool 'Write' received ~5001 tokens (threshold: 5000)"
        );

        let issues = detect_oversized_inputs(&trace.sessions(), 100);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_redundant_reads() {
        let mut events: Vec<Event> = (0..3)
            .map(|i| pre("s1", i, "Grep", r#"{"pattern":"fn main"}"#))
            .collect();
        events.push(pre("s1", 3, "Read", r#"{"file_path":"src/lib.rs"}"#));
        events.push(pre("s1", 4, "Read", r#"{"file_path":"src/lib.rs"}"#));
        events.extend((5..9).map(|i| pre("s1", i, "Write", "same")));
        let trace = TraceSet::from_events(events);

        let issues = detect_redundant_reads(&trace.sessions());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        match &issues[0].kind {
            IssueKind::RedundantReads {
                read_count,
                args_preview,
                ..
            } => {
                assert_eq!(*read_count, 3);
                assert_eq!(args_preview, r#"{"pattern":"fn main"}"#);
            }
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn test_reads_without_preview_are_not_redundant() {
        let trace = TraceSet::from_events(
            (0..5)
                .map(|i| Event::new("s1", &at(i), EventType::PreToolUse).with_tool("Read"))
                .collect(),
        );
        assert!(detect_redundant_reads(&trace.sessions()).is_empty());
    }

    #[test]
    fn test_redundant_read_preview_is_truncated() {
        let long = "x".repeat(300);
        let trace = TraceSet::from_events((0..3).map(|i| pre("s1", i, "Glob", &long)).collect());
        let issues = detect_redundant_reads(&trace.sessions());
        match &issues[0].kind {
            IssueKind::RedundantReads { args_preview, .. } => assert_eq!(args_preview.len(), 100),
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn test_inefficient_tool_usage() {
        let mut events = Vec::new();
        for i in 0..4 {
            let status = if i < 2 { "error" } else { "success" };
            events.push(pre("s1", i * 2, "Bash", &text(1200)));
            events.push(post("s1", i * 2 + 1, "Bash", status, ""));
        }
        // cheap failures are not waste
        for i in 0..4 {
            events.push(pre("s2", i * 2, "Edit", &text(10)));
            events.push(post("s2", i * 2 + 1, "Edit", "error", ""));
        }
        let trace = TraceSet::from_events(events);

        let issues = detect_wasteful_tools(&trace.sessions());
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].kind,
            IssueKind::InefficientToolUsage {
                tool: "Bash".to_string(),
                total_calls: 4,
                error_rate: 50.0,
                tokens_per_call: 1200,
            }
        );
        assert_eq!(
            issues[0].message,
            "Tool 'Bash' has 50.0% error rate with ~1200 tokens/call"
        );
    }

    #[test]
    fn test_two_calls_are_not_judged_for_efficiency() {
        let trace = TraceSet::from_events(vec![
            pre("s1", 0, "Bash", &text(5000)),
            post("s1", 1, "Bash", "error", ""),
            pre("s1", 2, "Bash", &text(5000)),
            post("s1", 3, "Bash", "error", ""),
        ]);
        assert!(detect_wasteful_tools(&trace.sessions()).is_empty());
    }

    #[test]
    fn test_heavy_context_loading() {
        let mut events: Vec<Event> = (0..6)
            .map(|i| pre("s1", i + 1, "Read", &format!("{{\"file_path\":\"src/m{i}.rs\"}}")))
            .collect();
        events.push(Event::new("s1", &at(0), EventType::SessionStart));
        let trace = TraceSet::from_events(events);

        let issues = detect_heavy_context_loading(&trace.sessions());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        match &issues[0].kind {
            IssueKind::HeavyContextLoading {
                read_count,
                estimated_tokens,
                ..
            } => {
                assert_eq!(*read_count, 6);
                assert_eq!(*estimated_tokens, 6 * 6);
            }
            other => panic!("unexpected issue {other:?}"),
        }
    }

    #[test]
    fn test_late_reads_are_outside_the_window() {
        let mut events: Vec<Event> = (0..EARLY_WINDOW)
            .map(|i| pre("s1", i, "Bash", "ls"))
            .collect();
        events.extend((0..10).map(|i| pre("s1", EARLY_WINDOW + i, "Read", "file")));
        let trace = TraceSet::from_events(events);
        assert!(detect_heavy_context_loading(&trace.sessions()).is_empty());
    }

    #[test]
    fn test_traces_without_previews_are_clean() {
        let mut events = Vec::new();
        for i in 0..30 {
            events.push(Event::new("s1", &at(i), EventType::PreToolUse).with_tool("Grep"));
            events.push(
                Event::new("s1", &at(i), EventType::PostToolUse)
                    .with_tool("Grep")
                    .with_status("error"),
            );
        }
        let trace = TraceSet::from_events(events);
        assert!(detect_token_inefficiency(&trace.sessions(), DEFAULT_TOKEN_THRESHOLD).is_empty());
    }
}
