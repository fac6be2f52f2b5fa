//! Session health score
//!
//! A fixed linear model over four signals, starting from 100:
//!
//! | signal | default penalty |
//! |---|---|
//! | overall tool error rate | `rate × 40` |
//! | tools with error rate > 0.2 | `10` each, capped at `30` |
//! | no SessionStart / no SessionEnd or Stop | `10` each |
//! | PostToolUse / PreToolUse completeness | `(1 − min(ratio, 1)) × 10` |
//!
//! The result is clamped to `[0, 100]` and truncated to an integer. The
//! weights live in [`HealthWeights`] so the model can be audited; the
//! defaults are the contract.
//!
//! # Example
//! ```
//! use ctxaudit::health::{HealthInputs, HealthWeights, score};
//!
//! let inputs = HealthInputs {
//!     total_calls: 10,
//!     total_errors: 0,
//!     unreliable_tools: 0,
//!     has_session_start: true,
//!     has_session_end: true,
//!     pre_tool_use: 10,
//!     post_tool_use: 10,
//! };
//! assert_eq!(score(&inputs, &HealthWeights::default()).score, 100);
//! ```

use crate::event::{Event, EventType};
use crate::loader::{Session, TraceSet};
use crate::stats::ToolStatsTracker;
use serde::{Deserialize, Serialize};

/// Weights of the health model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthWeights {
    /// Multiplier for the overall error rate (0..=1)
    pub error_rate_weight: f64,
    /// Penalty per unreliable tool
    pub unreliable_tool_penalty: f64,
    /// Maximum total penalty for unreliable tools
    pub unreliable_tool_cap: f64,
    /// Error rate above which a tool is unreliable
    pub unreliable_error_rate: f64,
    /// Penalty when no SessionStart was observed
    pub missing_start_penalty: f64,
    /// Penalty when neither SessionEnd nor Stop was observed
    pub missing_end_penalty: f64,
    /// Multiplier for the fraction of PreToolUse without completion
    pub pairing_weight: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            error_rate_weight: 40.0,
            unreliable_tool_penalty: 10.0,
            unreliable_tool_cap: 30.0,
            unreliable_error_rate: 0.2,
            missing_start_penalty: 10.0,
            missing_end_penalty: 10.0,
            pairing_weight: 10.0,
        }
    }
}

impl HealthWeights {
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("error_rate_weight", self.error_rate_weight),
            ("unreliable_tool_penalty", self.unreliable_tool_penalty),
            ("unreliable_tool_cap", self.unreliable_tool_cap),
            ("missing_start_penalty", self.missing_start_penalty),
            ("missing_end_penalty", self.missing_end_penalty),
            ("pairing_weight", self.pairing_weight),
        ];
        for (name, value) in weights {
            if !(value >= 0.0) {
                return Err(format!("{name} must be non-negative, got {value}"));
            }
        }
        if !(0.0..=1.0).contains(&self.unreliable_error_rate) {
            return Err(format!(
                "unreliable_error_rate must be in [0, 1], got {}",
                self.unreliable_error_rate
            ));
        }
        Ok(())
    }
}

/// Signals the score is computed from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthInputs {
    /// PostToolUse observations
    pub total_calls: u64,
    /// PostToolUse observations with status error
    pub total_errors: u64,
    /// Tools whose error rate exceeds the unreliability threshold
    pub unreliable_tools: usize,
    pub has_session_start: bool,
    /// SessionEnd or Stop observed
    pub has_session_end: bool,
    pub pre_tool_use: u64,
    pub post_tool_use: u64,
}

impl HealthInputs {
    /// Collect inputs from any set of events
    pub fn from_events<'a, I>(events: I, weights: &HealthWeights) -> Self
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut has_session_start = false;
        let mut has_session_end = false;
        let mut tracker = ToolStatsTracker::new();

        for event in events {
            match event.event_type {
                EventType::SessionStart => has_session_start = true,
                EventType::SessionEnd | EventType::Stop => has_session_end = true,
                _ => {}
            }
            tracker.record(event);
        }

        let (total_calls, total_errors) = tracker.call_totals();
        let unreliable_tools = tracker
            .tools()
            .values()
            .filter(|stats| stats.calls > 0 && stats.error_rate() > weights.unreliable_error_rate)
            .count();

        Self {
            total_calls,
            total_errors,
            unreliable_tools,
            has_session_start,
            has_session_end,
            pre_tool_use: tracker.totals().pre_tool_use,
            post_tool_use: tracker.totals().post_tool_use,
        }
    }

    pub fn from_trace(trace: &TraceSet, weights: &HealthWeights) -> Self {
        Self::from_events(trace.events(), weights)
    }

    pub fn from_session(session: &Session<'_>, weights: &HealthWeights) -> Self {
        Self::from_events(session.events.iter().copied(), weights)
    }

    /// Overall error rate, 0.0 without calls
    pub fn error_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_errors as f64 / self.total_calls as f64
        }
    }
}

/// Penalty contributed by each signal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthPenalties {
    pub error_rate: f64,
    pub unreliable_tools: f64,
    pub missing_start: f64,
    pub missing_end: f64,
    pub pairing: f64,
}

impl HealthPenalties {
    pub fn total(&self) -> f64 {
        self.error_rate + self.unreliable_tools + self.missing_start + self.missing_end + self.pairing
    }
}

/// Coarse classification of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Alert,
    Warn,
    Ok,
}

impl HealthStatus {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            HealthStatus::Ok
        } else if score >= 50 {
            HealthStatus::Warn
        } else {
            HealthStatus::Alert
        }
    }
}

/// Health score with the inputs that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthScore {
    /// 0..=100
    pub score: u8,
    pub status: HealthStatus,
    pub inputs: HealthInputs,
    pub penalties: HealthPenalties,
}

/// Compute the score for given inputs
pub fn score(inputs: &HealthInputs, weights: &HealthWeights) -> HealthScore {
    let mut penalties = HealthPenalties::default();

    if inputs.total_calls > 0 {
        penalties.error_rate = inputs.error_rate() * weights.error_rate_weight;
    }

    penalties.unreliable_tools = (inputs.unreliable_tools as f64 * weights.unreliable_tool_penalty)
        .min(weights.unreliable_tool_cap);

    if !inputs.has_session_start {
        penalties.missing_start = weights.missing_start_penalty;
    }
    if !inputs.has_session_end {
        penalties.missing_end = weights.missing_end_penalty;
    }

    if inputs.pre_tool_use > 0 {
        let pairing_rate = (inputs.post_tool_use as f64 / inputs.pre_tool_use as f64).min(1.0);
        penalties.pairing = (1.0 - pairing_rate) * weights.pairing_weight;
    }

    let raw = 100.0 - penalties.total();
    let score = raw.clamp(0.0, 100.0).trunc() as u8;

    HealthScore {
        score,
        status: HealthStatus::from_score(score),
        inputs: inputs.clone(),
        penalties,
    }
}

/// Score a whole trace set
pub fn score_trace(trace: &TraceSet, weights: &HealthWeights) -> HealthScore {
    score(&HealthInputs::from_trace(trace, weights), weights)
}

/// Score a single session
pub fn score_session(session: &Session<'_>, weights: &HealthWeights) -> HealthScore {
    score(&HealthInputs::from_session(session, weights), weights)
}
