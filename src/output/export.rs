//! Timestamped results file
//!
//! Writes the per-value listing to `search_results_<YYYYmmdd_HHMMSS>.txt`.

use crate::output::console::{format_summary, format_value_results};
use crate::output::report::CrawlReport;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name for a report written at `at`
pub fn export_file_name(at: &DateTime<Local>) -> String {
    format!("search_results_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Formats the full exported report
pub fn format_export(report: &CrawlReport, at: &DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str("=== Search Results ===\n\n");
    out.push_str(&format!("Search performed on: {}\n", at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Start URL: {}\n", report.base_url));
    out.push_str(&format!("Search values: {}\n", report.search_values.join(", ")));
    out.push_str(&format_summary(report));

    for value in &report.search_values {
        out.push_str(&format_value_results(report, value));
    }
    out
}

/// Writes the report into `dir`, creating it if needed
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(io::Error)` - The file could not be written
pub fn export_results(report: &CrawlReport, dir: &Path) -> io::Result<PathBuf> {
    let now = Local::now();
    fs::create_dir_all(dir)?;

    let path = dir.join(export_file_name(&now));
    let mut file = File::create(&path)?;
    file.write_all(format_export(report, &now).as_bytes())?;

    tracing::info!("Results exported to {}", path.display());
    Ok(path)
}
