//! Human-readable rendering of crawl results
//!
//! Matches are listed per search value, across all four search kinds, with
//! duplicates (same page and same content) collapsed.

use crate::output::report::{CrawlReport, MatchRecord};
use crate::search::{MatchedNode, SearchKind};
use std::collections::HashSet;

/// The matches for one search value, de-duplicated by URL and content
///
/// Order follows the kinds (text, id, class, attr) then discovery order.
pub fn unique_matches<'a>(report: &'a CrawlReport, value: &str) -> Vec<&'a MatchRecord> {
    let mut seen = HashSet::new();
    SearchKind::ALL
        .iter()
        .flat_map(|kind| report.matches(*kind, value))
        .filter(|record| seen.insert((record.url.as_str(), record.node.display_text().trim())))
        .collect()
}

/// Formats one value's section of the results listing
pub fn format_value_results(report: &CrawlReport, value: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nResults for '{}':\n", value));

    let matches = unique_matches(report, value);
    if matches.is_empty() {
        out.push_str("No elements found\n");
        out.push_str("Note: The element might be:\n");
        out.push_str("1. Not present on any crawled page\n");
        out.push_str("2. On pages not yet crawled\n");
        out.push_str("3. Dynamically loaded by JavaScript\n");
        out.push_str("4. In a different format or have different attributes\n");
        return out;
    }

    out.push_str(&format!("Found {} unique occurrence(s):\n", matches.len()));
    for record in matches {
        out.push_str(&format!("\nFound on page: {}\n", record.url));
        out.push_str(&format_node(&record.node));
    }
    out
}

fn format_node(node: &MatchedNode) -> String {
    let mut out = String::new();
    match node {
        MatchedNode::Text {
            content,
            parent,
            hidden,
        } => {
            out.push_str(&format!("Text content: {}\n", content));
            if let Some(parent) = parent {
                out.push_str(&format!("Inside: <{}>\n", parent));
            }
            if let Some(reason) = hidden {
                out.push_str(&format!("Hidden: {}\n", reason));
            }
        }
        MatchedNode::Element {
            tag,
            attributes,
            text,
            hidden,
        } => {
            out.push_str(&format!("Tag: {}\n", tag));
            if !attributes.is_empty() {
                out.push_str("Attributes:\n");
                for (key, value) in attributes {
                    out.push_str(&format!("  {}: {}\n", key, value));
                }
            }
            if !text.is_empty() {
                out.push_str(&format!("Text content: {}\n", text));
            }
            if let Some(reason) = hidden {
                out.push_str(&format!("Hidden: {}\n", reason));
            }
        }
    }
    out
}

/// Formats the found/not-found summary
pub fn format_summary(report: &CrawlReport) -> String {
    let mut out = String::new();
    out.push_str("\n=== Search Summary ===\n");
    out.push_str(&format!(
        "Found {} out of {} values:\n",
        report.found_values.len(),
        report.search_values.len()
    ));
    for value in &report.search_values {
        if report.is_found(value) {
            out.push_str(&format!("✓ Found: '{}'\n", value));
        } else {
            out.push_str(&format!("✗ Not found: '{}'\n", value));
        }
    }
    out.push_str(&format!(
        "\nPages visited: {} | Errors: {} | Time: {:.1}s | Ended: {}\n",
        report.pages_visited,
        report.error_count,
        report.elapsed_secs,
        report.termination.description()
    ));
    out
}

/// Prints the summary and the per-value listing to stdout
///
/// The error log is only printed when `verbose` is set.
pub fn print_results(report: &CrawlReport, verbose: bool) {
    if report.error_count > 0 {
        println!("\nEncountered {} errors during crawl", report.error_count);
        if verbose {
            println!("\nError log:");
            for error in &report.error_log {
                println!("- {}", error);
            }
        }
    }

    print!("{}", format_summary(report));

    println!("\n=== Search Results ===");
    for value in &report.search_values {
        print!("{}", format_value_results(report, value));
    }
}
