use super::pending::{CallKey, PendingCalls};
use crate::event::Event;
use serde::{Deserialize, Serialize};

/// How a PostToolUse finds its PreToolUse
pub trait MatchStrategy {
    fn name(&self) -> &'static str;

    /// Remove and return the matching pending call, with whether the match
    /// was on the exact key
    fn take_match<'a>(
        &self,
        pending: &mut PendingCalls<'a>,
        post: &'a Event,
    ) -> Option<(&'a Event, bool)>;
}

/// Exact key first, then any pending call for the same tool
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactThenAnyTool;

impl MatchStrategy for ExactThenAnyTool {
    fn name(&self) -> &'static str {
        "exact_then_any_tool"
    }

    fn take_match<'a>(
        &self,
        pending: &mut PendingCalls<'a>,
        post: &'a Event,
    ) -> Option<(&'a Event, bool)> {
        if let Some(pre) = pending.take_exact(&CallKey::of(post)) {
            return Some((pre, true));
        }
        pending.take_any(post.tool()).map(|pre| (pre, false))
    }
}

/// Exact key only
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictExact;

impl MatchStrategy for StrictExact {
    fn name(&self) -> &'static str {
        "strict_exact"
    }

    fn take_match<'a>(
        &self,
        pending: &mut PendingCalls<'a>,
        post: &'a Event,
    ) -> Option<(&'a Event, bool)> {
        pending
            .take_exact(&CallKey::of(post))
            .map(|pre| (pre, true))
    }
}

/// Configurable choice of strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum PairingMode {
    #[default]
    ExactThenAnyTool,
    StrictExact,
}

impl PairingMode {
    pub fn strategy(&self) -> &'static dyn MatchStrategy {
        match self {
            PairingMode::ExactThenAnyTool => &ExactThenAnyTool,
            PairingMode::StrictExact => &StrictExact,
        }
    }
}
