use super::AggregateKey;
use crate::loader::TraceSet;
use crate::stats::ToolStatsTracker;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Call and error counts for one aggregate key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub count: u64,
    pub errors: u64,
}

/// Everything the differencer needs from one trace
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceAggregate {
    pub key: AggregateKey,
    pub by_key: BTreeMap<String, KeyStats>,
    /// Tool names with at least one error event
    pub error_tools: BTreeSet<String>,
    /// Tool names of tool-bearing events in timestamp order
    pub tool_sequence: Vec<String>,
    /// Event type names of every event in timestamp order
    pub event_sequence: Vec<String>,
    /// Duration samples of completed calls per tool name
    pub durations_ms: BTreeMap<String, Vec<f64>>,
    pub total_events: usize,
}

impl TraceAggregate {
    pub fn build(trace: &TraceSet, key: AggregateKey) -> Self {
        let ordered = trace.events_by_time();
        let tracker = ToolStatsTracker::from_events(ordered.iter().copied());

        let mut aggregate = TraceAggregate {
            key,
            total_events: ordered.len(),
            ..TraceAggregate::default()
        };

        for event in &ordered {
            aggregate
                .event_sequence
                .push(event.event_type.as_str().to_string());
            let Some(tool) = event.tool_name.as_deref() else {
                continue;
            };
            aggregate.tool_sequence.push(tool.to_string());
            if event.is_error() {
                aggregate.error_tools.insert(tool.to_string());
            }
            if key == AggregateKey::EventAndTool {
                let stats = aggregate
                    .by_key
                    .entry(format!("{}:{}", event.event_type, tool))
                    .or_default();
                stats.count += 1;
                if event.is_error() {
                    stats.errors += 1;
                }
            }
        }

        for (tool, stats) in tracker.tools() {
            if key == AggregateKey::Tool {
                aggregate.by_key.insert(
                    tool.clone(),
                    KeyStats {
                        count: stats.calls,
                        errors: stats.errors,
                    },
                );
            }
            if !stats.durations_ms.is_empty() {
                aggregate
                    .durations_ms
                    .insert(tool.clone(), stats.durations_ms.clone());
            }
        }

        aggregate
    }
}
