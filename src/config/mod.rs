//! Configuration module for crawl runs
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Validation happens before any request is made, so a bad limit or URL fails
//! the run before seeding.
//!
//! # Example
//!
//! ```no_run
//! use wheres_my_value::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, EngineConfig, HistoryConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_ENGINE_MS, MAX_PAGES_LIMIT, MAX_TIMEOUT, MAX_WORKERS_LIMIT};
