//! Session index (`sessions.json`) and trace selection
//!
//! The index is an optional side-file written by the event source. It is
//! only used to pick which trace to load; when it is missing, empty or
//! corrupt, selection falls back to the most recently modified trace file.

use crate::error::{Result, TraceError};
use crate::loader::{session_id_from_path, trace_files, TRACE_FILE_EXTENSION, TRACE_FILE_PREFIX};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File name of the session index inside a traces directory
pub const INDEX_FILE_NAME: &str = "sessions.json";

/// Metadata fields an index entry is expected to carry
pub const RECOMMENDED_FIELDS: &[&str] = &["started_at", "event_count"];

/// One session entry from the index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub started_at: Option<String>,
    pub event_count: Option<u64>,
    /// Recommended fields the entry lacks
    pub missing: Vec<String>,
}

/// Parsed session index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionIndex {
    pub sessions: Vec<SessionMetadata>,
}

impl SessionIndex {
    /// Entry with the greatest `started_at`
    pub fn latest(&self) -> Option<&SessionMetadata> {
        self.sessions.iter().max_by(|a, b| {
            a.started_at
                .as_deref()
                .unwrap_or("")
                .cmp(b.started_at.as_deref().unwrap_or(""))
        })
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionMetadata> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    /// Interpret an index document
    ///
    /// Accepts either `{"sessions": [{"session_id": .., ..}]}` or an object
    /// keyed by session id. Returns `None` when the value is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let mut sessions = Vec::new();
        if let Some(list) = object.get("sessions").and_then(Value::as_array) {
            for entry in list {
                let Some(fields) = entry.as_object() else {
                    continue;
                };
                let Some(id) = fields.get("session_id").and_then(Value::as_str) else {
                    continue;
                };
                sessions.push(metadata_from(id, entry));
            }
        } else {
            for (id, entry) in object {
                if entry.is_object() {
                    sessions.push(metadata_from(id, entry));
                }
            }
        }

        Some(Self { sessions })
    }
}

fn metadata_from(session_id: &str, entry: &Value) -> SessionMetadata {
    let missing = RECOMMENDED_FIELDS
        .iter()
        .filter(|field| entry.get(**field).is_none())
        .map(|field| field.to_string())
        .collect();

    SessionMetadata {
        session_id: session_id.to_string(),
        started_at: entry
            .get("started_at")
            .and_then(Value::as_str)
            .map(str::to_string),
        event_count: entry.get("event_count").and_then(Value::as_u64),
        missing,
    }
}

/// Outcome of reading the index file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexStatus {
    Missing,
    Empty,
    Invalid { reason: String },
    InvalidStructure,
    Loaded { index: SessionIndex },
}

impl IndexStatus {
    /// Read `sessions.json` from a traces directory; never fails
    pub fn read(traces_dir: &Path) -> Self {
        let path = traces_dir.join(INDEX_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return IndexStatus::Missing,
            Err(e) => {
                return IndexStatus::Invalid {
                    reason: e.to_string(),
                }
            }
        };

        Self::parse(&content)
    }

    /// Interpret index file content
    pub fn parse(content: &str) -> Self {
        let content = content.trim();
        if content.is_empty() {
            return IndexStatus::Empty;
        }

        match serde_json::from_str::<Value>(content) {
            Ok(value) => match SessionIndex::from_value(&value) {
                Some(index) => IndexStatus::Loaded { index },
                None => IndexStatus::InvalidStructure,
            },
            Err(e) => IndexStatus::Invalid {
                reason: e.to_string(),
            },
        }
    }

    pub fn index(&self) -> Option<&SessionIndex> {
        match self {
            IndexStatus::Loaded { index } => Some(index),
            _ => None,
        }
    }
}

/// Path of the trace log for a session id
pub fn trace_path(traces_dir: &Path, session_id: &str) -> PathBuf {
    traces_dir.join(format!(
        "{TRACE_FILE_PREFIX}{session_id}.{TRACE_FILE_EXTENSION}"
    ))
}

/// A trace chosen for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTrace {
    pub session_id: String,
    pub path: PathBuf,
}

/// Pick the trace to analyze
///
/// With an explicit id the file `session_<id>.jsonl` is used. Otherwise the
/// index's latest session is tried first, then the most recently modified
/// trace file. Returns `Ok(None)` when the directory holds no traces.
pub fn select_session(traces_dir: &Path, session_id: Option<&str>) -> Result<Option<SelectedTrace>> {
    if let Some(id) = session_id {
        return Ok(Some(SelectedTrace {
            session_id: id.to_string(),
            path: trace_path(traces_dir, id),
        }));
    }

    if let Some(latest) = IndexStatus::read(traces_dir).index().and_then(SessionIndex::latest) {
        let path = trace_path(traces_dir, &latest.session_id);
        if path.is_file() {
            return Ok(Some(SelectedTrace {
                session_id: latest.session_id.clone(),
                path,
            }));
        }
        tracing::debug!(
            session = %latest.session_id,
            "indexed session has no trace file, falling back to newest trace"
        );
    }

    Ok(recent_traces(traces_dir, 1)?
        .into_iter()
        .next()
        .map(|path| SelectedTrace {
            session_id: session_id_from_path(&path).unwrap_or_default(),
            path,
        }))
}

/// The `n` most recently modified trace files, newest first
pub fn recent_traces(traces_dir: &Path, n: usize) -> Result<Vec<PathBuf>> {
    let mut files: Vec<(SystemTime, PathBuf)> = trace_files(traces_dir)?
        .into_iter()
        .map(|path| {
            let mtime = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (mtime, path)
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(files.into_iter().take(n).map(|(_, path)| path).collect())
}

/// The two most recent traces as `(older, newer)`
pub fn latest_pair(traces_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let mut recent = recent_traces(traces_dir, 2)?;
    if recent.len() < 2 {
        return Err(TraceError::NotEnoughTraces {
            dir: traces_dir.to_path_buf(),
            found: recent.len(),
        });
    }
    let newer = recent.remove(0);
    let older = recent.remove(0);
    Ok((older, newer))
}
