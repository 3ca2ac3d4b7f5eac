//! Crawler module for page fetching and searching
//!
//! This module contains the core crawling logic, including:
//! - The politeness filter deciding what may be fetched
//! - The shared frontier with at-most-once scheduling
//! - HTTP fetching with error classification
//! - Page searching and link extraction
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod filter;
mod frontier;
mod parser;

pub use coordinator::{run_crawl, ProgressCallback, StopHandle, WebCrawler};
pub use fetcher::{build_http_client, Fetcher, Page, RequestHeaders, CONSECUTIVE_FAILURE_WARN_THRESHOLD};
pub use filter::{PolitenessFilter, SkipReason, MAX_CRAWL_DELAY};
pub use frontier::{Frontier, FrontierEntry, InFlight};
pub use parser::{analyze_page, extract_links, LinkScope, PageAnalysis, MAX_LINKS_PER_PAGE};
