use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Window of consecutive tool names
pub type NGram = Vec<String>;

/// N-gram occurrence counts
pub type NGramMap = BTreeMap<NGram, usize>;

/// Extract N-grams from a tool-name sequence
///
/// # Example
/// ```
/// use ctxaudit::diff::extract_ngrams;
///
/// let tools = vec!["Read".to_string(), "Edit".to_string(), "Bash".to_string()];
/// let ngrams = extract_ngrams(&tools, 2);
///
/// assert_eq!(ngrams.len(), 2);
/// assert_eq!(ngrams.get(&vec!["Read".to_string(), "Edit".to_string()]), Some(&1));
/// ```
pub fn extract_ngrams(tools: &[String], n: usize) -> NGramMap {
    let mut ngrams = NGramMap::new();
    if n == 0 || tools.len() < n {
        return ngrams;
    }

    for window in tools.windows(n) {
        *ngrams.entry(window.to_vec()).or_insert(0) += 1;
    }

    ngrams
}

/// How two tool-name sequences differ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceDivergence {
    pub identical: bool,
    pub baseline_length: usize,
    pub current_length: usize,
    /// First index where the sequences disagree (or the shorter length)
    pub first_difference: Option<usize>,
    /// N-grams seen only in the baseline
    pub missing_ngrams: BTreeSet<NGram>,
    /// N-grams seen only in the current trace
    pub new_ngrams: BTreeSet<NGram>,
}

/// Compare two tool-name sequences
pub fn compare_sequences(baseline: &[String], current: &[String], ngram_size: usize) -> SequenceDivergence {
    let first_difference = baseline
        .iter()
        .zip(current)
        .position(|(a, b)| a != b)
        .or_else(|| (baseline.len() != current.len()).then(|| baseline.len().min(current.len())));

    let baseline_ngrams = extract_ngrams(baseline, ngram_size);
    let current_ngrams = extract_ngrams(current, ngram_size);

    let missing_ngrams = baseline_ngrams
        .keys()
        .filter(|ngram| !current_ngrams.contains_key(*ngram))
        .cloned()
        .collect();
    let new_ngrams = current_ngrams
        .keys()
        .filter(|ngram| !baseline_ngrams.contains_key(*ngram))
        .cloned()
        .collect();

    SequenceDivergence {
        identical: first_difference.is_none(),
        baseline_length: baseline.len(),
        current_length: current.len(),
        first_difference,
        missing_ngrams,
        new_ngrams,
    }
}
