//! Coverage summary
//!
//! Provides:
//! - Cobertura XML parsing of the report generator's summary output
//! - Threshold validation

mod cobertura;
mod threshold;

pub use cobertura::*;
pub use threshold::*;

use serde::Serialize;

/// File name the report generator uses for its Cobertura output
pub const COBERTURA_FILE: &str = "Cobertura.xml";

/// Coverage totals for a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageData {
    pub line_coverage: Option<f64>,
    pub branch_coverage: Option<f64>,
    pub lines_covered: u32,
    pub lines_total: u32,
    pub branches_covered: u32,
    pub branches_total: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileCoverage>,
}

impl CoverageData {
    pub fn calculate_line_percentage(&self) -> f64 {
        percentage(self.lines_covered, self.lines_total)
    }

    pub fn calculate_branch_percentage(&self) -> f64 {
        percentage(self.branches_covered, self.branches_total)
    }

    /// Files with the lowest line coverage first, skipping files without lines.
    pub fn least_covered(&self, limit: usize) -> Vec<&FileCoverage> {
        let mut files: Vec<&FileCoverage> = self.files.iter().filter(|f| f.lines_total > 0).collect();
        files.sort_by(|a, b| {
            a.line_coverage
                .total_cmp(&b.line_coverage)
                .then_with(|| a.path.cmp(&b.path))
        });
        files.truncate(limit);
        files
    }
}

/// Coverage data for a single source file
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileCoverage {
    pub path: String,
    pub lines_covered: u32,
    pub lines_total: u32,
    pub branches_covered: u32,
    pub branches_total: u32,
    pub line_coverage: f64,
    pub branch_coverage: f64,
}

pub(crate) fn percentage(covered: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (covered as f64 / total as f64) * 100.0
}
