//! Crawl results and summaries
//!
//! [`CrawlReport`] is what a finished run hands back: every match keyed by
//! `"<kind>:<value>"`, the found values, the run statistics and the reason
//! the run ended.

use crate::search::{result_key, MatchedNode, SearchKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Why a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A stop was requested from outside the run
    Cancelled,
    /// Every search value produced a text match
    AllValuesFound,
    /// The page budget was used up
    PageBudgetReached,
    /// Nothing left to fetch and no worker busy
    FrontierExhausted,
    /// No page or error was recorded within the no-progress timeout
    NoProgress,
    /// The start URL could not be fetched
    StartUnreachable,
    /// robots.txt disallows the start URL
    StartDisallowed,
    /// The start URL is already in the visited history
    AlreadyVisited,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::AllValuesFound => "all_values_found",
            Self::PageBudgetReached => "page_budget_reached",
            Self::FrontierExhausted => "frontier_exhausted",
            Self::NoProgress => "no_progress",
            Self::StartUnreachable => "start_unreachable",
            Self::StartDisallowed => "start_disallowed",
            Self::AlreadyVisited => "already_visited",
        }
    }

    /// Whether the run ended before any page could be crawled
    pub fn is_seeding_failure(&self) -> bool {
        matches!(
            self,
            Self::StartUnreachable | Self::StartDisallowed | Self::AlreadyVisited
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Cancelled => "Crawl stopped on request",
            Self::AllValuesFound => "Found all target values",
            Self::PageBudgetReached => "Reached the maximum number of pages",
            Self::FrontierExhausted => "No more pages to process",
            Self::NoProgress => "No progress within the no-progress timeout",
            Self::StartUnreachable => "The start URL could not be fetched",
            Self::StartDisallowed => "The start URL is blocked by robots.txt",
            Self::AlreadyVisited => "The start URL was visited in a previous run",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One match: the page it was found on and what matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub url: String,
    /// Matched text, or a short element descriptor when the element has none
    pub text: String,
    pub node: MatchedNode,
}

impl MatchRecord {
    pub fn new(url: impl Into<String>, node: MatchedNode) -> Self {
        let text = describe(&node);
        Self {
            url: url.into(),
            text,
            node,
        }
    }
}

fn describe(node: &MatchedNode) -> String {
    match node {
        MatchedNode::Text { content, .. } => content.clone(),
        MatchedNode::Element {
            tag,
            attributes,
            text,
            ..
        } => {
            if !text.is_empty() {
                return text.clone();
            }
            let attrs: String = attributes
                .iter()
                .map(|(k, v)| format!(" {}=\"{}\"", k, v))
                .collect();
            format!("<{}{}>", tag, attrs)
        }
    }
}

/// The simplified summary form of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Sorted
    pub found_values: Vec<String>,
    pub pages_visited: usize,
    pub errors: usize,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub base_url: String,
    /// In caller order
    pub search_values: Vec<String>,
    pub results: BTreeMap<String, Vec<MatchRecord>>,
    pub found_values: BTreeSet<String>,
    pub pages_visited: usize,
    pub error_count: usize,
    pub error_log: Vec<String>,
    /// Size of the visited set at the end of the run, history included
    pub visited_urls: usize,
    pub elapsed_secs: f64,
    pub termination: TerminationReason,
}

impl CrawlReport {
    /// A report with an empty entry for every criterion key
    pub fn empty(base_url: impl Into<String>, search_values: &[String], termination: TerminationReason) -> Self {
        let results = search_values
            .iter()
            .flat_map(|value| SearchKind::ALL.iter().map(move |kind| result_key(*kind, value)))
            .map(|key| (key, Vec::new()))
            .collect();

        Self {
            base_url: base_url.into(),
            search_values: search_values.to_vec(),
            results,
            found_values: BTreeSet::new(),
            pages_visited: 0,
            error_count: 0,
            error_log: Vec::new(),
            visited_urls: 0,
            elapsed_secs: 0.0,
            termination,
        }
    }

    pub fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            found_values: self.found_values.iter().cloned().collect(),
            pages_visited: self.pages_visited,
            errors: self.error_count,
        }
    }

    /// Matches recorded for one (kind, value) criterion
    pub fn matches(&self, kind: SearchKind, value: &str) -> &[MatchRecord] {
        self.results
            .get(&result_key(kind, value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_found(&self, value: &str) -> bool {
        self.found_values.contains(value)
    }

    pub fn all_found(&self) -> bool {
        self.search_values.iter().all(|v| self.is_found(v))
    }

    pub fn total_matches(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    /// The result payload as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
