//! Cobertura XML format parser

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{percentage, CoverageData, FileCoverage};
use crate::error::{CovxError, Result};

/// Parse a Cobertura XML file
pub fn parse_cobertura(path: &Path) -> Result<CoverageData> {
    let content = fs::read_to_string(path).map_err(|e| CovxError::io(path, e))?;
    parse_cobertura_string(&content)
}

/// Per-file line and branch counters
#[derive(Default)]
struct Counters {
    lines_covered: u32,
    lines_total: u32,
    branches_covered: u32,
    branches_total: u32,
}

/// Parse Cobertura XML content from a string.
///
/// Classes sharing a file name (partial or nested classes) are merged into a
/// single [`FileCoverage`].
pub fn parse_cobertura_string(content: &str) -> Result<CoverageData> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut data = CoverageData::default();
    let mut per_file: BTreeMap<String, Counters> = BTreeMap::new();
    let mut current_file: Option<String> = None;
    let mut in_methods = false;
    let mut saw_root = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"methods" => in_methods = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"methods" => in_methods = false,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"coverage" => {
                    saw_root = true;
                    read_totals(e, &mut data);
                }
                b"class" => {
                    current_file = attr(e, b"filename").filter(|f| !f.is_empty());
                    if let Some(ref file) = current_file {
                        per_file.entry(file.clone()).or_default();
                    }
                }
                // Method-level lines repeat the class lines.
                b"line" if !in_methods => {
                    if let Some(ref file) = current_file {
                        let counters = per_file.entry(file.clone()).or_default();
                        count_line(e, counters);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"class" => current_file = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CovxError::Parse(format!(
                    "Error parsing Cobertura XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(CovxError::Parse(
            "Cobertura XML has no <coverage> element".to_string(),
        ));
    }

    data.files = per_file
        .into_iter()
        .map(|(path, c)| FileCoverage {
            path,
            line_coverage: percentage(c.lines_covered, c.lines_total),
            branch_coverage: percentage(c.branches_covered, c.branches_total),
            lines_covered: c.lines_covered,
            lines_total: c.lines_total,
            branches_covered: c.branches_covered,
            branches_total: c.branches_total,
        })
        .collect();

    // Fall back to file sums when the root omits totals
    if data.lines_total == 0 {
        data.lines_total = data.files.iter().map(|f| f.lines_total).sum();
        data.lines_covered = data.files.iter().map(|f| f.lines_covered).sum();
    }
    if data.branches_total == 0 {
        data.branches_total = data.files.iter().map(|f| f.branches_total).sum();
        data.branches_covered = data.files.iter().map(|f| f.branches_covered).sum();
    }

    if data.line_coverage.is_none() {
        data.line_coverage = Some(data.calculate_line_percentage());
    }
    if data.branch_coverage.is_none() {
        data.branch_coverage = Some(data.calculate_branch_percentage());
    }

    Ok(data)
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn read_totals(e: &BytesStart, data: &mut CoverageData) {
    let rate = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<f64>().ok()).map(|r| r * 100.0);
    let count = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);

    data.line_coverage = rate(b"line-rate");
    data.branch_coverage = rate(b"branch-rate");
    data.lines_covered = count(b"lines-covered");
    data.lines_total = count(b"lines-valid");
    data.branches_covered = count(b"branches-covered");
    data.branches_total = count(b"branches-valid");
}

fn count_line(e: &BytesStart, counters: &mut Counters) {
    counters.lines_total += 1;

    let hits = attr(e, b"hits").and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    if hits > 0 {
        counters.lines_covered += 1;
    }

    let is_branch = attr(e, b"branch")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !is_branch {
        return;
    }

    // condition-coverage="50% (1/2)"
    if let Some((covered, total)) = attr(e, b"condition-coverage").and_then(|v| parse_conditions(&v)) {
        counters.branches_covered += covered;
        counters.branches_total += total;
    }
}

fn parse_conditions(value: &str) -> Option<(u32, u32)> {
    let inner = value.split_once('(')?.1.split_once(')')?.0;
    let (covered, total) = inner.split_once('/')?;
    Some((covered.trim().parse().ok()?, total.trim().parse().ok()?))
}
