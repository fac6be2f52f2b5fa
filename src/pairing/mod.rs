// Call Pairing for PreToolUse/PostToolUse Events
//
// Walks a session in timestamp order and matches every PostToolUse against a
// pending PreToolUse. Calls are keyed by (tool name, timestamp truncated to
// the second). Whatever is still pending after the sweep is an unpaired
// PreToolUse: an execution that was interrupted or crashed.
//
// Key Insight: exact second-granularity keys miss sub-second completions
// that straddle a second boundary, so the default strategy falls back to any
// pending call for the same tool. The fallback is lossy and lives behind the
// MatchStrategy trait so a stricter matcher can replace it.
//
// Which pending call the fallback picks when several are pending for one
// tool is implementation-defined. Callers must not depend on it.

mod pending;
mod strategy;

pub use pending::{CallKey, PendingCalls};
pub use strategy::{ExactThenAnyTool, MatchStrategy, PairingMode, StrictExact};

use crate::event::{Event, EventType};
use crate::loader::{Session, SessionView};
use std::collections::BTreeMap;

/// One matched invocation
#[derive(Debug, Clone, Copy)]
pub struct CallPair<'a> {
    pub pre: &'a Event,
    pub post: &'a Event,
    /// Matched on the exact (tool, second) key
    pub exact: bool,
}

/// Outcome of pairing one session
#[derive(Debug, Clone, Default)]
pub struct PairingResult<'a> {
    pub pairs: Vec<CallPair<'a>>,
    /// PreToolUse events never completed, in timestamp order
    pub unpaired_pre: Vec<&'a Event>,
    /// PostToolUse events with no pending PreToolUse
    pub unmatched_post: Vec<&'a Event>,
}

impl<'a> PairingResult<'a> {
    pub fn is_fully_paired(&self) -> bool {
        self.unpaired_pre.is_empty() && self.unmatched_post.is_empty()
    }

    /// Pairs matched through a fallback rather than the exact key
    pub fn fallback_pairs(&self) -> usize {
        self.pairs.iter().filter(|pair| !pair.exact).count()
    }
}

/// Pair the tool events of one session
///
/// `session.events` must already be in timestamp order, which
/// [`TraceSet::sessions`](crate::loader::TraceSet::sessions) guarantees.
pub fn resolve_session<'a>(
    session: &Session<'a>,
    strategy: &dyn MatchStrategy,
) -> PairingResult<'a> {
    let mut pending = PendingCalls::new();
    let mut result = PairingResult::default();

    for &event in &session.events {
        match event.event_type {
            EventType::PreToolUse => pending.push(event),
            EventType::PostToolUse => match strategy.take_match(&mut pending, event) {
                Some((pre, exact)) => result.pairs.push(CallPair {
                    pre,
                    post: event,
                    exact,
                }),
                None => result.unmatched_post.push(event),
            },
            _ => {}
        }
    }

    result.unpaired_pre = pending.into_remaining();

    tracing::debug!(
        session = session.id,
        strategy = strategy.name(),
        pairs = result.pairs.len(),
        fallback = result.fallback_pairs(),
        unpaired = result.unpaired_pre.len(),
        "paired session"
    );

    result
}

/// Pair every session independently
pub fn resolve_all<'a>(
    sessions: &SessionView<'a>,
    strategy: &dyn MatchStrategy,
) -> BTreeMap<&'a str, PairingResult<'a>> {
    sessions
        .iter()
        .map(|(&id, session)| (id, resolve_session(session, strategy)))
        .collect()
}
