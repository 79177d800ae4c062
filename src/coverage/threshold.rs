//! Coverage threshold validation

use colored::Colorize;
use serde::Serialize;

use super::CoverageData;
use crate::config::Thresholds;

/// Result of threshold validation
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResult {
    pub passed: bool,
    pub line_coverage: Option<f64>,
    pub branch_coverage: Option<f64>,
    pub line_threshold: Option<f64>,
    pub branch_threshold: Option<f64>,
}

impl ThresholdResult {
    /// Human-readable list of the thresholds that were missed.
    pub fn failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        for (kind, coverage, threshold) in [
            ("line", self.line_coverage, self.line_threshold),
            ("branch", self.branch_coverage, self.branch_threshold),
        ] {
            match (coverage, threshold) {
                (Some(coverage), Some(threshold)) if coverage < threshold => {
                    failures.push(format!("{} {:.1}% < {:.1}%", kind, coverage, threshold));
                }
                (None, Some(threshold)) => {
                    failures.push(format!("{} coverage unavailable (threshold {:.1}%)", kind, threshold));
                }
                _ => {}
            }
        }
        failures
    }

    pub fn print_summary(&self) {
        print_line("Line", self.line_coverage, self.line_threshold);
        print_line("Branch", self.branch_coverage, self.branch_threshold);
    }
}

fn print_line(kind: &str, coverage: Option<f64>, threshold: Option<f64>) {
    let Some(threshold) = threshold else {
        return;
    };
    let Some(coverage) = coverage else {
        println!(
            "  {} {} coverage: unavailable (threshold: {:.1}%)",
            "✗".red(),
            kind,
            threshold
        );
        return;
    };

    let delta = coverage - threshold;
    let status = if delta >= 0.0 { "✓".green() } else { "✗".red() };
    let delta_str = if delta >= 0.0 {
        format!("+{:.1}%", delta).green()
    } else {
        format!("{:.1}%", delta).red()
    };

    println!(
        "  {} {} coverage: {:.1}% (threshold: {:.1}%, {})",
        status, kind, coverage, threshold, delta_str
    );
}

/// Validate coverage against thresholds. A missing threshold always passes.
pub fn validate_threshold(data: &CoverageData, thresholds: Thresholds) -> ThresholdResult {
    let line_coverage = data.line_coverage;
    let branch_coverage = data.branch_coverage;

    let line_passed = match (line_coverage, thresholds.line) {
        (Some(cov), Some(thresh)) => cov >= thresh,
        (None, Some(_)) => false,
        _ => true,
    };

    let branch_passed = match (branch_coverage, thresholds.branch) {
        (Some(cov), Some(thresh)) => cov >= thresh,
        (None, Some(_)) => false,
        _ => true,
    };

    ThresholdResult {
        passed: line_passed && branch_passed,
        line_coverage,
        branch_coverage,
        line_threshold: thresholds.line,
        branch_threshold: thresholds.branch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> CoverageData {
        CoverageData {
            line_coverage: Some(75.0),
            branch_coverage: Some(50.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_threshold_validation() {
        let result = validate_threshold(
            &data(),
            Thresholds {
                line: Some(70.0),
                branch: Some(40.0),
            },
        );
        assert!(result.passed);
        assert!(result.failures().is_empty());

        let result = validate_threshold(
            &data(),
            Thresholds {
                line: Some(80.0),
                branch: Some(40.0),
            },
        );
        assert!(!result.passed);
        assert_eq!(result.failures(), vec!["line 75.0% < 80.0%"]);
    }

    #[test]
    fn test_no_thresholds_always_pass() {
        let result = validate_threshold(&CoverageData::default(), Thresholds::default());
        assert!(result.passed);
    }

    #[test]
    fn test_unknown_coverage_fails_a_set_threshold() {
        let result = validate_threshold(
            &CoverageData::default(),
            Thresholds {
                line: None,
                branch: Some(10.0),
            },
        );
        assert!(!result.passed);
        assert_eq!(result.failures(), vec!["branch coverage unavailable (threshold 10.0%)"]);
    }
}
