//! Trace loading from newline-delimited JSON session logs
//!
//! Each line parses on its own. A bad line is dropped with a diagnostic and
//! the load continues; files may still be appended to by a live session.
//! A final segment without a newline that does not parse is treated as a
//! write in progress, not as corruption.
//!
//! # Example
//!
//! ```
//! use ctxaudit::loader::parse_trace_bytes;
//!
//! let data = b"{\"timestamp\":\"2025-01-01T10:00:00Z\",\"event_type\":\"SessionStart\",\"session_id\":\"s1\"}\nnot json\n";
//! let trace = parse_trace_bytes(data, "session_s1.jsonl");
//! assert_eq!(trace.events().len(), 1);
//! assert_eq!(trace.diagnostics().len(), 1);
//! ```

use crate::error::{Result, TraceError};
use crate::event::{Event, EventOrigin};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name prefix of per-session trace logs
pub const TRACE_FILE_PREFIX: &str = "session_";

/// File extension of per-session trace logs
pub const TRACE_FILE_EXTENSION: &str = "jsonl";

/// Why a line was not turned into an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Complete line that is not a valid event record
    InvalidJson { error: String },
    /// Line bytes are not UTF-8
    InvalidUtf8,
    /// Trailing segment without newline that does not parse yet
    TruncatedTail,
    /// A trace file inside a scanned directory could not be read
    UnreadableFile { error: String },
}

/// A recovered loading problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadDiagnostic {
    pub source: String,
    /// 1-based line number (0 for whole-file problems)
    pub line: usize,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

/// Events of one session, ordered by timestamp
#[derive(Debug, Clone)]
pub struct Session<'a> {
    pub id: &'a str,
    pub events: Vec<&'a Event>,
}

impl<'a> Session<'a> {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Session id → session view
pub type SessionView<'a> = BTreeMap<&'a str, Session<'a>>;

/// Everything read from one or more trace sources
#[derive(Debug, Clone, Default)]
pub struct TraceSet {
    events: Vec<Event>,
    diagnostics: Vec<LoadDiagnostic>,
    sources: Vec<String>,
}

impl TraceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trace set from already-parsed events
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events,
            diagnostics: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Events in load order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn diagnostics(&self) -> &[LoadDiagnostic] {
        &self.diagnostics
    }

    /// Names of the sources that contributed events or diagnostics
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append another trace set (e.g. the next file of a directory)
    pub fn merge(&mut self, other: TraceSet) {
        self.events.extend(other.events);
        self.diagnostics.extend(other.diagnostics);
        self.sources.extend(other.sources);
    }

    /// Events sorted by timestamp; ties keep load order
    pub fn events_by_time(&self) -> Vec<&Event> {
        let mut ordered: Vec<&Event> = self.events.iter().collect();
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        ordered
    }

    /// Group events by session id, each session ordered by timestamp
    pub fn sessions(&self) -> SessionView<'_> {
        let mut view: SessionView<'_> = BTreeMap::new();
        for event in &self.events {
            let id = event.session();
            view.entry(id)
                .or_insert_with(|| Session {
                    id,
                    events: Vec::new(),
                })
                .events
                .push(event);
        }
        for session in view.values_mut() {
            session
                .events
                .sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
        view
    }

    /// Malformed-line diagnostics, excluding in-progress tails
    pub fn malformed_lines(&self) -> impl Iterator<Item = &LoadDiagnostic> {
        self.diagnostics.iter().filter(|d| {
            matches!(
                d.kind,
                DiagnosticKind::InvalidJson { .. } | DiagnosticKind::InvalidUtf8
            )
        })
    }
}

/// Parse raw trace bytes into a trace set
///
/// `source` names the origin in diagnostics and event origins.
pub fn parse_trace_bytes(data: &[u8], source: &str) -> TraceSet {
    let mut trace = TraceSet {
        events: Vec::new(),
        diagnostics: Vec::new(),
        sources: vec![source.to_string()],
    };

    let ends_with_newline = data.last() == Some(&b'\n');
    let segments: Vec<&[u8]> = data.split(|&b| b == b'\n').collect();
    let last_index = segments.len().saturating_sub(1);

    for (index, raw) in segments.iter().enumerate() {
        let line_no = index + 1;
        let is_tail = index == last_index && !ends_with_newline;

        let Ok(text) = std::str::from_utf8(raw) else {
            record_bad_line(&mut trace, source, line_no, is_tail, DiagnosticKind::InvalidUtf8);
            continue;
        };

        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match serde_json::from_str::<Event>(text) {
            Ok(mut event) => {
                event.origin = EventOrigin {
                    source: source.to_string(),
                    line: line_no,
                };
                trace.events.push(event);
            }
            Err(e) => {
                let kind = DiagnosticKind::InvalidJson {
                    error: e.to_string(),
                };
                record_bad_line(&mut trace, source, line_no, is_tail, kind);
            }
        }
    }

    tracing::debug!(
        source,
        events = trace.events.len(),
        diagnostics = trace.diagnostics.len(),
        "parsed trace"
    );

    trace
}

fn record_bad_line(
    trace: &mut TraceSet,
    source: &str,
    line: usize,
    is_tail: bool,
    kind: DiagnosticKind,
) {
    let kind = if is_tail {
        tracing::debug!(source, line, "ignoring partially written trailing line");
        DiagnosticKind::TruncatedTail
    } else {
        tracing::warn!(source, line, ?kind, "skipping malformed trace line");
        kind
    };
    trace.diagnostics.push(LoadDiagnostic {
        source: source.to_string(),
        line,
        kind,
    });
}

/// Load a single trace file
///
/// # Errors
/// Returns [`TraceError::Open`] when the file cannot be read at all.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<TraceSet> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| TraceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_trace_bytes(&data, &source_name(path)))
}

/// Load every `session_*.jsonl` file in a traces directory
///
/// Files are read in name order. A file that disappears or cannot be read
/// mid-scan becomes an [`DiagnosticKind::UnreadableFile`] diagnostic.
///
/// # Errors
/// Returns [`TraceError::Open`] when the directory itself cannot be listed.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<TraceSet> {
    let dir = dir.as_ref();
    let mut trace = TraceSet::new();

    for path in trace_files(dir)? {
        let name = source_name(&path);
        match fs::read(&path) {
            Ok(data) => trace.merge(parse_trace_bytes(&data, &name)),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable trace file");
                trace.diagnostics.push(LoadDiagnostic {
                    source: name.clone(),
                    line: 0,
                    kind: DiagnosticKind::UnreadableFile {
                        error: e.to_string(),
                    },
                });
                trace.sources.push(name);
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        files = trace.sources.len(),
        events = trace.events.len(),
        "loaded traces"
    );

    Ok(trace)
}

/// Load a file, or every trace file when `path` is a directory
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<TraceSet> {
    let path = path.as_ref();
    if path.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

/// List `session_*.jsonl` files in a directory, sorted by name
pub fn trace_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| TraceError::Open {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_trace_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Whether a path looks like a per-session trace log
pub fn is_trace_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext == TRACE_FILE_EXTENSION);
    let has_prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TRACE_FILE_PREFIX));
    has_extension && has_prefix && path.is_file()
}

/// Session id encoded in a trace file name (`session_<id>.jsonl`)
pub fn session_id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.strip_prefix(TRACE_FILE_PREFIX))
        .map(str::to_string)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
