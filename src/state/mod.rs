//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: Lifecycle of a run (idle, seeding, running, draining, done)
//! - `CrawlStats`: Atomic page/error counters, the error log and progress reporting
//! - `HistoryStore`: The visited set persisted as JSON between runs

mod history;
mod phase;
mod stats;

// Re-export main types
pub use history::HistoryStore;
pub use phase::CrawlPhase;
pub use stats::{CrawlStats, ProgressSnapshot};
