//! Console and JSON rendering of a finished coverage run

use colored::Colorize;

use crate::coverage::CoverageData;
use crate::error::{CovxError, Result};
use crate::orchestrator::RunSummary;

/// Number of least-covered files listed in the console summary
const WORST_FILES: usize = 5;

pub fn to_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| CovxError::Parse(format!("cannot serialize run summary: {}", e)))
}

pub fn print_summary(summary: &RunSummary) {
    println!("{}", "─".repeat(50).dimmed());

    if let Some(ref coverage) = summary.coverage {
        print_coverage(coverage);
    }

    if let Some(ref thresholds) = summary.thresholds {
        thresholds.print_summary();
    }

    if summary.thresholds_passed() {
        println!(
            "{} Coverage report generated ({}ms)",
            "✓".green().bold(),
            summary.duration_ms
        );
    } else {
        println!(
            "{} Coverage report generated, thresholds not met ({}ms)",
            "✗".red().bold(),
            summary.duration_ms
        );
    }

    println!(
        "  {} {}",
        "report:".dimmed(),
        summary.report_index.display().to_string().green()
    );
}

fn print_coverage(coverage: &CoverageData) {
    let line = coverage.line_coverage.unwrap_or_else(|| coverage.calculate_line_percentage());
    let branch = coverage.branch_coverage.unwrap_or_else(|| coverage.calculate_branch_percentage());

    println!(
        "  {} {:.1}% ({}/{})",
        "Lines:".bold(),
        line,
        coverage.lines_covered,
        coverage.lines_total
    );
    println!(
        "  {} {:.1}% ({}/{})",
        "Branches:".bold(),
        branch,
        coverage.branches_covered,
        coverage.branches_total
    );

    let worst = coverage.least_covered(WORST_FILES);
    if worst.is_empty() {
        return;
    }

    println!("\n{}", "Least covered files:".bold());
    for file in worst {
        let pct = format!("{:>5.1}%", file.line_coverage);
        let pct = if file.line_coverage < 50.0 {
            pct.red()
        } else if file.line_coverage < 80.0 {
            pct.yellow()
        } else {
            pct.green()
        };
        println!("  {} {}", pct, file.path);
    }
    println!();
}
