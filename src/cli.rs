//! CLI argument parsing for ctxaudit

use crate::audit::AuditPass;
use crate::config::AnalysisConfig;
use crate::diff::AggregateKey;
use crate::pairing::PairingMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ctxaudit")]
#[command(version)]
#[command(about = "Health, reliability and regression analysis for tool-use session traces", long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Load thresholds and weights from a TOML file
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run anomaly and compliance passes over a trace file or traces directory
    Audit(AuditArgs),
    /// Compute the health score of a trace
    Health(HealthArgs),
    /// Compare two traces and report regressions
    Diff(DiffArgs),
    /// Summarize event and tool counts of a trace
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Trace file or traces directory
    pub path: PathBuf,

    /// Intermittent failure error-rate threshold (0.0-1.0)
    #[arg(long = "threshold", value_name = "RATE")]
    pub threshold: Option<f64>,

    /// Oscillation change-rate threshold (0.0-1.0)
    #[arg(long = "oscillation-threshold", value_name = "RATE")]
    pub oscillation_threshold: Option<f64>,

    /// Passes to run (comma separated; default all)
    #[arg(long = "pass", value_enum, value_delimiter = ',', value_name = "PASS")]
    pub passes: Vec<AuditPass>,

    /// Enable strict compliance checks
    #[arg(long = "strict")]
    pub strict: bool,

    /// Call pairing strategy
    #[arg(long = "pairing", value_enum, value_name = "MODE")]
    pub pairing: Option<PairingMode>,

    /// Estimated tokens of a single tool input above which it is oversized
    #[arg(long = "token-threshold", value_name = "TOKENS")]
    pub token_threshold: Option<u64>,
}

impl AuditArgs {
    /// Apply command-line overrides on top of file configuration
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(threshold) = self.threshold {
            config.audit.intermittency_threshold = threshold;
        }
        if let Some(threshold) = self.oscillation_threshold {
            config.audit.oscillation_threshold = threshold;
        }
        if !self.passes.is_empty() {
            config.audit.passes = self.passes.clone();
        }
        if self.strict {
            config.audit.strict = true;
        }
        if let Some(pairing) = self.pairing {
            config.audit.pairing = pairing;
        }
        if let Some(tokens) = self.token_threshold {
            config.audit.token_threshold = tokens;
        }
    }
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Trace file or traces directory
    pub path: PathBuf,

    /// Session to score when PATH is a traces directory
    #[arg(long = "session", value_name = "ID")]
    pub session: Option<String>,

    /// Score every session separately
    #[arg(long = "per-session")]
    pub per_session: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Baseline trace file
    #[arg(requires = "current", conflicts_with = "traces_dir")]
    pub baseline: Option<PathBuf>,

    /// Current trace file
    pub current: Option<PathBuf>,

    /// Compare the most recent traces in this directory
    #[arg(long = "traces-dir", value_name = "DIR")]
    pub traces_dir: Option<PathBuf>,

    /// Number of recent traces to compare (only 2 is supported)
    #[arg(long = "last", value_name = "N", requires = "traces_dir")]
    pub last: Option<usize>,

    /// Aggregation key
    #[arg(long = "key", value_enum, value_name = "KEY")]
    pub key: Option<AggregateKey>,

    /// Exit with status 1 when regressions are detected
    #[arg(long = "fail-on-regression")]
    pub fail_on_regression: bool,
}

impl DiffArgs {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(key) = self.key {
            config.diff.key = key;
        }
    }
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Trace file or traces directory
    pub path: PathBuf,
}
