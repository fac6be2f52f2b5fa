// Shared helpers for integration tests
//
// Builds compliant trace lines and lays out traces directories on disk.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Deterministic UUID-shaped event id
pub fn event_id(n: usize) -> String {
    format!("00000000-0000-4000-8000-{n:012x}")
}

/// Timestamp `offset` seconds after 2025-01-01T10:00:00Z
pub fn ts(offset: u32) -> String {
    format!("2025-01-01T10:{:02}:{:02}Z", offset / 60, offset % 60)
}

/// Builder for a single session's lines
pub struct TraceBuilder {
    session_id: String,
    lines: Vec<Value>,
    clock: u32,
    id_base: usize,
}

impl TraceBuilder {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            lines: Vec::new(),
            clock: 0,
            id_base: session_id
                .bytes()
                .fold(0usize, |acc, b| (acc * 31 + b as usize) % 1_000_000)
                * 10_000,
        }
    }

    fn next_ts(&mut self) -> String {
        let stamp = ts(self.clock);
        self.clock += 1;
        stamp
    }

    fn push(&mut self, mut line: Value) -> &mut Self {
        line["event_id"] = json!(event_id(self.id_base + self.lines.len() + 1));
        line["session_id"] = json!(self.session_id);
        let stamp = self.next_ts();
        line["timestamp"] = json!(stamp);
        self.lines.push(line);
        self
    }

    pub fn start(&mut self) -> &mut Self {
        self.push(json!({"event_type": "SessionStart", "status": "success"}))
    }

    pub fn end(&mut self) -> &mut Self {
        self.push(json!({"event_type": "SessionEnd", "status": "success"}))
    }

    pub fn pre(&mut self, tool: &str) -> &mut Self {
        self.push(json!({"event_type": "PreToolUse", "tool_name": tool, "status": "pending"}))
    }

    pub fn post(&mut self, tool: &str, status: &str) -> &mut Self {
        let mut line = json!({
            "event_type": "PostToolUse",
            "tool_name": tool,
            "status": status,
            "duration_ms": 12.5,
        });
        if status == "error" {
            line["error_message"] = json!(format!("{tool} exited with status 2"));
        }
        self.push(line)
    }

    /// PreToolUse immediately followed by its PostToolUse
    pub fn call(&mut self, tool: &str, status: &str) -> &mut Self {
        self.pre(tool).post(tool, status)
    }

    /// Completed call carrying argument and result previews
    pub fn call_with_previews(&mut self, tool: &str, args: &str, result: &str) -> &mut Self {
        self.push(json!({
            "event_type": "PreToolUse",
            "tool_name": tool,
            "status": "pending",
            "args_preview": args,
        }));
        self.push(json!({
            "event_type": "PostToolUse",
            "tool_name": tool,
            "status": "success",
            "duration_ms": 12.5,
            "result_preview": result,
        }))
    }

    pub fn raw(&mut self, line: Value) -> &mut Self {
        self.lines.push(line);
        self
    }

    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }

    /// Write `session_<id>.jsonl` into `dir`
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("session_{}.jsonl", self.session_id));
        fs::write(&path, self.to_jsonl()).expect("write trace file");
        path
    }
}

/// Write a sessions index listing the given `(id, started_at)` pairs
pub fn write_index(dir: &Path, sessions: &[(&str, &str)]) -> PathBuf {
    let entries: Vec<Value> = sessions
        .iter()
        .map(|(id, started_at)| {
            json!({"session_id": id, "started_at": started_at, "event_count": 0})
        })
        .collect();
    let path = dir.join("sessions.json");
    fs::write(&path, json!({ "sessions": entries }).to_string()).expect("write index");
    path
}
