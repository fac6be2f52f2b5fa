// Duration comparison with Welch's t-test
//
// Wraps aprender's hypothesis tests and descriptive statistics. Only tools
// with enough samples on both sides are tested; failed tests are skipped.

use aprender::stats::DescriptiveStats;
use serde::Serialize;
use std::collections::BTreeMap;
use trueno::Vector;

/// A statistically significant change in a tool's call duration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationShift {
    pub tool: String,
    pub baseline_median_ms: f32,
    pub current_median_ms: f32,
    pub statistic: f32,
    pub pvalue: f32,
    pub baseline_samples: usize,
    pub current_samples: usize,
}

impl DurationShift {
    /// Current slower than baseline
    pub fn is_slowdown(&self) -> bool {
        self.current_median_ms > self.baseline_median_ms
    }
}

/// Median using aprender's quantile estimator
pub fn median(samples: &[f32]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    let vector = Vector::from_slice(samples);
    DescriptiveStats::new(&vector).quantile(0.5).ok()
}

/// Test every tool present on both sides for a duration shift
pub fn detect_duration_shifts(
    baseline: &BTreeMap<String, Vec<f64>>,
    current: &BTreeMap<String, Vec<f64>>,
    min_samples: usize,
    significance_level: f64,
) -> Vec<DurationShift> {
    let mut shifts = Vec::new();

    for (tool, baseline_ms) in baseline {
        let Some(current_ms) = current.get(tool) else {
            continue;
        };
        if baseline_ms.len() < min_samples.max(2) || current_ms.len() < min_samples.max(2) {
            continue;
        }

        let a: Vec<f32> = baseline_ms.iter().map(|&d| d as f32).collect();
        let b: Vec<f32> = current_ms.iter().map(|&d| d as f32).collect();

        let result = match aprender::stats::hypothesis::ttest_ind(&a, &b, false) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %tool, error = %e, "skipping duration t-test");
                continue;
            }
        };

        if !(f64::from(result.pvalue) < significance_level) {
            continue;
        }

        let (Some(baseline_median_ms), Some(current_median_ms)) = (median(&a), median(&b)) else {
            continue;
        };

        shifts.push(DurationShift {
            tool: tool.clone(),
            baseline_median_ms,
            current_median_ms,
            statistic: result.statistic,
            pvalue: result.pvalue,
            baseline_samples: a.len(),
            current_samples: b.len(),
        });
    }

    shifts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(tool: &str, values: &[f64]) -> BTreeMap<String, Vec<f64>> {
        BTreeMap::from([(tool.to_string(), values.to_vec())])
    }

    #[test]
    fn test_slowdown_detected() {
        let baseline = samples("Bash", &[100.0, 102.0, 98.0, 101.0, 99.0]);
        let current = samples("Bash", &[400.0, 410.0, 395.0, 405.0, 398.0]);
        let shifts = detect_duration_shifts(&baseline, &current, 5, 0.05);
        assert_eq!(shifts.len(), 1);
        assert!(shifts[0].is_slowdown());
        assert!(shifts[0].pvalue < 0.05);
    }

    #[test]
    fn test_similar_durations_not_reported() {
        let baseline = samples("Read", &[10.0, 12.0, 11.0, 13.0, 10.0]);
        let current = samples("Read", &[11.0, 12.0, 10.0, 13.0, 11.0]);
        assert!(detect_duration_shifts(&baseline, &current, 5, 0.05).is_empty());
    }

    #[test]
    fn test_too_few_samples_skipped() {
        let baseline = samples("Bash", &[100.0, 101.0]);
        let current = samples("Bash", &[900.0, 901.0]);
        assert!(detect_duration_shifts(&baseline, &current, 5, 0.05).is_empty());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }
}
