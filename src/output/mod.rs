//! Output module for crawl results
//!
//! This module handles:
//! - The crawl report and its simplified summary form
//! - Rendering results to the terminal
//! - Exporting results to a timestamped text file

mod console;
mod export;
mod report;

pub use console::{format_summary, format_value_results, print_results, unique_matches};
pub use export::{export_file_name, export_results, format_export};
pub use report::{CrawlReport, CrawlSummary, MatchRecord, TerminationReason};
