//! Per-trace summary
//!
//! Event type counts, per-tool call/error/duration totals over Pre and
//! PostToolUse, the error list and the wall-clock span of the trace.

use crate::event::{Event, EventType};
use crate::loader::TraceSet;
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Error text used when an error event carries none
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Tool totals over Pre/PostToolUse events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolTotals {
    pub count: u64,
    pub errors: u64,
    pub total_duration_ms: f64,
}

/// One error event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub tool: String,
    pub error: String,
}

/// One line of the event timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub timestamp: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSummary {
    /// Session of the first event
    pub session_id: Option<String>,
    pub total_events: usize,
    pub event_types: BTreeMap<String, u64>,
    pub tool_calls: BTreeMap<String, ToolTotals>,
    pub errors: Vec<ErrorRecord>,
    pub error_count: usize,
    /// Seconds between the first and last parseable timestamps
    pub duration_seconds: Option<f64>,
    pub timeline: Vec<TimelineEntry>,
}

impl TraceSummary {
    /// Summarize events in load order
    pub fn from_trace(trace: &TraceSet) -> Self {
        let events = trace.events();
        let mut event_types: BTreeMap<String, u64> = BTreeMap::new();
        let mut tool_calls: BTreeMap<String, ToolTotals> = BTreeMap::new();
        let mut errors = Vec::new();
        let mut timeline = Vec::with_capacity(events.len());

        for event in events {
            *event_types.entry(event.event_type.to_string()).or_insert(0) += 1;

            if event.event_type.is_tool_event() {
                let totals = tool_calls.entry(event.tool().to_string()).or_default();
                totals.count += 1;
                if event.is_error() {
                    totals.errors += 1;
                    errors.push(ErrorRecord {
                        timestamp: event.timestamp.clone(),
                        tool: event.tool().to_string(),
                        error: event
                            .error_message
                            .clone()
                            .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
                    });
                }
                if let Some(duration) = event.duration_ms {
                    totals.total_duration_ms += duration;
                }
            }

            timeline.push(TimelineEntry {
                timestamp: event.timestamp.clone(),
                event_type: event.event_type.to_string(),
                tool: event.tool_name.clone(),
                status: event.status.clone(),
            });
        }

        Self {
            session_id: events.first().and_then(|e| e.session_id.clone()),
            total_events: events.len(),
            event_types,
            tool_calls,
            error_count: errors.len(),
            errors,
            duration_seconds: span_seconds(events),
            timeline,
        }
    }

    pub fn count_of(&self, event_type: &EventType) -> u64 {
        self.event_types
            .get(event_type.as_str())
            .copied()
            .unwrap_or(0)
    }
}

enum Stamp {
    Zoned(DateTime<chrono::FixedOffset>),
    Naive(NaiveDateTime),
}

fn parse_instant(timestamp: &str) -> Option<Stamp> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(Stamp::Zoned(zoned));
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(Stamp::Naive)
}

/// Wall-clock span; `None` with fewer than two parseable timestamps or
/// when zoned and naive timestamps are mixed
fn span_seconds(events: &[Event]) -> Option<f64> {
    let mut parsed = events.iter().filter_map(|e| parse_instant(&e.timestamp));
    let first = parsed.next()?;
    let last = parsed.last()?;

    let delta = match (first, last) {
        (Stamp::Zoned(start), Stamp::Zoned(end)) => end.signed_duration_since(start),
        (Stamp::Naive(start), Stamp::Naive(end)) => end.signed_duration_since(start),
        _ => return None,
    };
    Some(delta.num_milliseconds() as f64 / 1000.0)
}
