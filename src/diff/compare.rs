use super::aggregate::TraceAggregate;
use super::sequence::{compare_sequences, SequenceDivergence};
use super::timing::{detect_duration_shifts, DurationShift};
use super::AggregateKey;
use crate::config::DiffConfig;
use crate::loader::TraceSet;
use serde::Serialize;

/// A value before and after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    pub from: u64,
    pub to: u64,
}

impl Change {
    fn between(from: u64, to: u64) -> Option<Self> {
        (from != to).then_some(Change { from, to })
    }

    pub fn increased(&self) -> bool {
        self.to > self.from
    }

    fn reversed(self) -> Self {
        Change {
            from: self.to,
            to: self.from,
        }
    }
}

/// A key present in both traces whose counts differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolChange {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Change>,
}

impl ToolChange {
    pub fn errors_increased(&self) -> bool {
        self.errors.is_some_and(|change| change.increased())
    }

    /// Same change seen from the other direction
    pub fn reversed(&self) -> Self {
        ToolChange {
            tool: self.tool.clone(),
            count: self.count.map(Change::reversed),
            errors: self.errors.map(Change::reversed),
        }
    }
}

/// Counts for presentation layers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added_count: usize,
    pub removed_count: usize,
    pub changed_count: usize,
    pub new_errors_count: usize,
    pub resolved_errors_count: usize,
    pub has_regressions: bool,
}

/// Comparison of a baseline trace against a current trace
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub key: AggregateKey,
    /// Keys only in the current trace, sorted
    pub added_tools: Vec<String>,
    /// Keys only in the baseline, sorted
    pub removed_tools: Vec<String>,
    pub changed_tools: Vec<ToolChange>,
    /// Tools erroring now that never errored in the baseline
    pub new_errors: Vec<String>,
    /// Tools that errored in the baseline and no longer do
    pub resolved_errors: Vec<String>,
    pub has_regressions: bool,
    /// Divergence of the tool-name sequences
    pub sequence: SequenceDivergence,
    /// Divergence of the event-type sequences
    pub event_sequence: SequenceDivergence,
    pub duration_shifts: Vec<DurationShift>,
    pub summary: DiffSummary,
}

/// Compare two aggregate views
///
/// Both aggregates must use the same [`AggregateKey`]; the baseline's key is
/// reported.
pub fn compare(baseline: &TraceAggregate, current: &TraceAggregate, config: &DiffConfig) -> DiffResult {
    let added_tools: Vec<String> = current
        .by_key
        .keys()
        .filter(|key| !baseline.by_key.contains_key(*key))
        .cloned()
        .collect();
    let removed_tools: Vec<String> = baseline
        .by_key
        .keys()
        .filter(|key| !current.by_key.contains_key(*key))
        .cloned()
        .collect();

    let changed_tools: Vec<ToolChange> = baseline
        .by_key
        .iter()
        .filter_map(|(key, before)| {
            let after = current.by_key.get(key)?;
            let count = Change::between(before.count, after.count);
            let errors = Change::between(before.errors, after.errors);
            (count.is_some() || errors.is_some()).then(|| ToolChange {
                tool: key.clone(),
                count,
                errors,
            })
        })
        .collect();

    let new_errors: Vec<String> = current
        .error_tools
        .difference(&baseline.error_tools)
        .cloned()
        .collect();
    let resolved_errors: Vec<String> = baseline
        .error_tools
        .difference(&current.error_tools)
        .cloned()
        .collect();

    let has_regressions =
        !new_errors.is_empty() || changed_tools.iter().any(ToolChange::errors_increased);

    let sequence = compare_sequences(
        &baseline.tool_sequence,
        &current.tool_sequence,
        config.ngram_size,
    );
    let event_sequence = compare_sequences(
        &baseline.event_sequence,
        &current.event_sequence,
        config.ngram_size,
    );
    let duration_shifts = detect_duration_shifts(
        &baseline.durations_ms,
        &current.durations_ms,
        config.min_duration_samples,
        config.significance_level,
    );

    let summary = DiffSummary {
        added_count: added_tools.len(),
        removed_count: removed_tools.len(),
        changed_count: changed_tools.len(),
        new_errors_count: new_errors.len(),
        resolved_errors_count: resolved_errors.len(),
        has_regressions,
    };

    tracing::info!(
        added = summary.added_count,
        removed = summary.removed_count,
        changed = summary.changed_count,
        new_errors = summary.new_errors_count,
        has_regressions,
        "diff complete"
    );

    DiffResult {
        key: baseline.key,
        added_tools,
        removed_tools,
        changed_tools,
        new_errors,
        resolved_errors,
        has_regressions,
        sequence,
        event_sequence,
        duration_shifts,
        summary,
    }
}

/// Aggregate both traces with the configured key and compare them
pub fn diff_traces(baseline: &TraceSet, current: &TraceSet, config: &DiffConfig) -> DiffResult {
    compare(
        &TraceAggregate::build(baseline, config.key),
        &TraceAggregate::build(current, config.key),
        config,
    )
}
