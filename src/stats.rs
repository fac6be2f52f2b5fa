//! Tool call statistics
//!
//! Aggregates PostToolUse observations per tool, both across the whole trace
//! set and per `(session, tool)`. Everything is rebuilt from the events on
//! every run.

use crate::event::{Event, EventType};
use crate::loader::TraceSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one completed tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn of(event: &Event) -> Self {
        if event.is_error() {
            Outcome::Error
        } else {
            Outcome::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Statistics for a single tool
///
/// Invariant: `successes + errors == calls`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolStats {
    /// Number of PostToolUse observations
    pub calls: u64,
    pub successes: u64,
    pub errors: u64,
    /// Sessions in which the tool completed at least once
    pub sessions: BTreeSet<String>,
    /// Outcomes in timestamp order
    pub outcomes: Vec<Outcome>,
    /// Reported durations in milliseconds
    pub durations_ms: Vec<f64>,
}

/// Duration summary for a tool (milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationSummary {
    pub mean: f32,
    pub stddev: f32,
    pub min: f32,
    pub max: f32,
    pub median: f32,
    pub p90: f32,
    pub p99: f32,
}

impl ToolStats {
    /// Record one completed call
    pub fn record(&mut self, event: &Event) {
        let outcome = Outcome::of(event);
        self.calls += 1;
        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::Error => self.errors += 1,
        }
        self.sessions.insert(event.session().to_string());
        self.outcomes.push(outcome);
        if let Some(duration) = event.duration_ms {
            self.durations_ms.push(duration);
        }
    }

    /// `errors / calls`, 0.0 when the tool never completed
    pub fn error_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.errors as f64 / self.calls as f64
        }
    }

    /// Number of adjacent outcome flips
    pub fn outcome_changes(&self) -> usize {
        self.outcomes.windows(2).filter(|w| w[0] != w[1]).count()
    }

    /// Duration statistics using Trueno, `None` without samples
    pub fn duration_summary(&self) -> Option<DurationSummary> {
        if self.durations_ms.is_empty() {
            return None;
        }

        let samples: Vec<f32> = self.durations_ms.iter().map(|&d| d as f32).collect();
        let v = trueno::Vector::from_slice(&samples);

        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Some(DurationSummary {
            mean: v.mean().unwrap_or(0.0),
            stddev: v.stddev().unwrap_or(0.0),
            min: v.min().unwrap_or(0.0),
            max: v.max().unwrap_or(0.0),
            median: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p99: percentile(&sorted, 99.0),
        })
    }
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted_data: &[f32], percentile: f32) -> f32 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f32;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f32;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Key for per-session statistics
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionToolKey {
    pub session_id: String,
    pub tool: String,
}

/// Event counts that feed pairing and health checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventTotals {
    pub total_events: u64,
    pub pre_tool_use: u64,
    pub post_tool_use: u64,
    pub session_starts: u64,
    pub session_ends: u64,
    pub stops: u64,
}

/// Tracks statistics for all tools in a trace set
#[derive(Debug, Default)]
pub struct ToolStatsTracker {
    global: BTreeMap<String, ToolStats>,
    per_session: BTreeMap<SessionToolKey, ToolStats>,
    totals: EventTotals,
}

impl ToolStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a trace set, visiting events in timestamp order
    pub fn from_trace(trace: &TraceSet) -> Self {
        Self::from_events(trace.events_by_time())
    }

    /// Build from events that are already in the desired order
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut tracker = Self::new();
        for event in events {
            tracker.record(event);
        }
        tracker
    }

    /// Record one event
    pub fn record(&mut self, event: &Event) {
        self.totals.total_events += 1;
        match event.event_type {
            EventType::PreToolUse => self.totals.pre_tool_use += 1,
            EventType::PostToolUse => {
                self.totals.post_tool_use += 1;
                self.global
                    .entry(event.tool().to_string())
                    .or_default()
                    .record(event);
                self.per_session
                    .entry(SessionToolKey {
                        session_id: event.session().to_string(),
                        tool: event.tool().to_string(),
                    })
                    .or_default()
                    .record(event);
            }
            EventType::SessionStart => self.totals.session_starts += 1,
            EventType::SessionEnd => self.totals.session_ends += 1,
            EventType::Stop => self.totals.stops += 1,
            _ => {}
        }
    }

    /// Global per-tool statistics
    pub fn tools(&self) -> &BTreeMap<String, ToolStats> {
        &self.global
    }

    pub fn tool(&self, name: &str) -> Option<&ToolStats> {
        self.global.get(name)
    }

    /// Per `(session, tool)` statistics
    pub fn per_session(&self) -> &BTreeMap<SessionToolKey, ToolStats> {
        &self.per_session
    }

    pub fn totals(&self) -> &EventTotals {
        &self.totals
    }

    /// Sum of calls and errors across all tools
    pub fn call_totals(&self) -> (u64, u64) {
        self.global
            .values()
            .fold((0, 0), |(calls, errors), s| (calls + s.calls, errors + s.errors))
    }

    /// Tools sorted by call count, most used first
    pub fn by_call_count(&self) -> Vec<(&str, &ToolStats)> {
        let mut sorted: Vec<_> = self
            .global
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .collect();
        sorted.sort_by(|a, b| b.1.calls.cmp(&a.1.calls));
        sorted
    }
}
