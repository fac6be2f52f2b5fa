// Trace Differencing Between Two Executions
//
// Each trace is reduced to an aggregate view (per-key call and error counts,
// the set of tools that ever errored, the tool-name and event-type
// sequences, duration samples). Two aggregates are compared key by key.
//
// The regression verdict depends only on error tools and error counts:
// - a tool that errors in the current trace but never errored before
// - a key present in both whose error count went up
//
// Sequence divergence and duration shifts are reported for context and never
// change the verdict. Duration shifts use Welch's t-test from aprender.

mod aggregate;
mod compare;
mod sequence;
mod timing;

pub use aggregate::{KeyStats, TraceAggregate};
pub use compare::{compare, diff_traces, Change, DiffResult, DiffSummary, ToolChange};
pub use sequence::{compare_sequences, extract_ngrams, NGram, NGramMap, SequenceDivergence};
pub use timing::{detect_duration_shifts, median, DurationShift};

use serde::{Deserialize, Serialize};

/// Granularity of the aggregate view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AggregateKey {
    /// Completed calls (PostToolUse) per tool name
    #[default]
    Tool,
    /// Every tool-bearing event keyed `EventType:tool`
    EventAndTool,
}
