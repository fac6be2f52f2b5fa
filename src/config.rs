//! Analysis configuration
//!
//! Thresholds, pass selection, health weights and diff options. Loadable
//! from TOML; every field has a default so partial files are fine.
//!
//! # Example
//! ```
//! use ctxaudit::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::default();
//! assert_eq!(config.audit.intermittency_threshold, 0.10);
//! assert_eq!(config.audit.oscillation_threshold, 0.40);
//! assert!(config.validate().is_ok());
//! ```

use crate::audit::{AuditPass, DEFAULT_TOKEN_THRESHOLD};
use crate::diff::AggregateKey;
use crate::error::{Result, TraceError};
use crate::health::HealthWeights;
use crate::pairing::PairingMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Audit pass selection and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Minimum error rate flagged as intermittent
    ///
    /// Tools failing on every call are excluded regardless of this value.
    pub intermittency_threshold: f64,

    /// Fraction of adjacent outcome flips above which a tool oscillates
    pub oscillation_threshold: f64,

    /// Passes to run; all of them by default
    pub passes: Vec<AuditPass>,

    /// Enable the stricter compliance checks (UUID event ids, index metadata)
    pub strict: bool,

    /// How PostToolUse events are matched to pending PreToolUse events
    pub pairing: PairingMode,

    /// Estimated input tokens above which a tool call is oversized
    pub token_threshold: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            intermittency_threshold: 0.10,
            oscillation_threshold: 0.40,
            passes: AuditPass::ALL.to_vec(),
            strict: false,
            pairing: PairingMode::ExactThenAnyTool,
            token_threshold: DEFAULT_TOKEN_THRESHOLD,
        }
    }
}

/// Options for comparing two traces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Granularity of the tool aggregate
    pub key: AggregateKey,

    /// Window size for tool-sequence n-grams
    pub ngram_size: usize,

    /// p-value below which a duration shift is reported
    pub significance_level: f64,

    /// Samples required on each side before testing durations
    pub min_duration_samples: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            key: AggregateKey::Tool,
            ngram_size: 2,
            significance_level: 0.05,
            min_duration_samples: 5,
        }
    }
}

/// Complete analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub audit: AuditConfig,
    pub health: HealthWeights,
    pub diff: DiffConfig,
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns [`TraceError::ConfigParse`] for unreadable or malformed files
    /// and [`TraceError::Config`] for out-of-range values.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TraceError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: AnalysisConfig =
            toml::from_str(&content).map_err(|e| TraceError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        config.validate().map_err(TraceError::Config)?;
        Ok(config)
    }

    /// Configuration shipped with the binary
    pub fn embedded_default() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../ctxaudit.default.toml");

        let config: AnalysisConfig = toml::from_str(DEFAULT_TOML).map_err(|e| {
            TraceError::ConfigParse {
                path: "ctxaudit.default.toml".into(),
                message: e.to_string(),
            }
        })?;
        config.validate().map_err(TraceError::Config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.audit.intermittency_threshold) {
            return Err(format!(
                "intermittency_threshold must be in [0, 1], got {}",
                self.audit.intermittency_threshold
            ));
        }

        if !(0.0..=1.0).contains(&self.audit.oscillation_threshold) {
            return Err(format!(
                "oscillation_threshold must be in [0, 1], got {}",
                self.audit.oscillation_threshold
            ));
        }

        if self.audit.token_threshold == 0 {
            return Err("token_threshold must be >= 1".to_string());
        }

        if self.diff.ngram_size == 0 {
            return Err("ngram_size must be >= 1".to_string());
        }

        if !(self.diff.significance_level > 0.0 && self.diff.significance_level < 1.0) {
            return Err(format!(
                "significance_level must be in (0, 1), got {}",
                self.diff.significance_level
            ));
        }

        if self.diff.min_duration_samples < 2 {
            return Err(format!(
                "min_duration_samples must be >= 2 for t-test, got {}",
                self.diff.min_duration_samples
            ));
        }

        self.health.validate()
    }
}
