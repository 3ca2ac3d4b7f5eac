use crate::config::types::{Config, CrawlerConfig, EngineConfig, HistoryConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_SEARCH_VALUE_LENGTH: usize = 100;
pub const MIN_SLEEP_TIME: f64 = 0.1;
pub const MAX_SLEEP_TIME: f64 = 10.0;
pub const MAX_PAGES_LIMIT: u32 = 1000;
pub const MAX_WORKERS_LIMIT: u32 = 5;
pub const MAX_TIMEOUT: f64 = 300.0;
/// Ceiling for engine intervals and the no-progress timeout (one hour)
pub const MAX_ENGINE_MS: u64 = 3_600_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_history_config(&config.history)?;
    validate_engine_config(&config.engine)?;
    Ok(())
}

/// Validates crawl targets and limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_base_url(&config.base_url)?;
    validate_search_values(&config.search_values)?;

    if !(MIN_SLEEP_TIME..=MAX_SLEEP_TIME).contains(&config.sleep_time) {
        return Err(ConfigError::Validation(format!(
            "sleep_time must be between {} and {} seconds, got {}",
            MIN_SLEEP_TIME, MAX_SLEEP_TIME, config.sleep_time
        )));
    }

    if !(config.timeout > 0.0 && config.timeout <= MAX_TIMEOUT) {
        return Err(ConfigError::Validation(format!(
            "timeout must be > 0 and <= {} seconds, got {}",
            MAX_TIMEOUT, config.timeout
        )));
    }

    if config.max_pages < 1 || config.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, config.max_pages
        )));
    }

    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_workers < 1 || config.max_workers > MAX_WORKERS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and {}, got {}",
            MAX_WORKERS_LIMIT, config.max_workers
        )));
    }

    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    if base_url.len() > MAX_URL_LENGTH {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url is longer than {} characters",
            MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            base_url
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            base_url
        )));
    }

    Ok(())
}

fn validate_search_values(values: &[String]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::Validation(
            "search_values must contain at least one value".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Validation(
                "search_values cannot contain empty values".to_string(),
            ));
        }
        if trimmed.chars().count() > MAX_SEARCH_VALUE_LENGTH {
            return Err(ConfigError::Validation(format!(
                "search value '{}' is longer than {} characters",
                trimmed, MAX_SEARCH_VALUE_LENGTH
            )));
        }
        if !seen.insert(trimmed) {
            return Err(ConfigError::Validation(format!(
                "search value '{}' is listed more than once",
                trimmed
            )));
        }
    }

    Ok(())
}

fn validate_history_config(config: &HistoryConfig) -> Result<(), ConfigError> {
    if config.enabled && config.file.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
        return Err(ConfigError::Validation(
            "history.file is required when history is enabled".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    for (name, ms) in [
        ("pop_timeout_ms", config.pop_timeout_ms),
        ("poll_interval_ms", config.poll_interval_ms),
        ("drain_timeout_ms", config.drain_timeout_ms),
    ] {
        if ms == 0 || ms > MAX_ENGINE_MS {
            return Err(ConfigError::Validation(format!(
                "engine.{} must be between 1 and {}, got {}",
                name, MAX_ENGINE_MS, ms
            )));
        }
    }

    if config.idle_checks == 0 {
        return Err(ConfigError::Validation(
            "engine.idle_checks must be >= 1".to_string(),
        ));
    }

    if config.save_every_pages == 0 {
        return Err(ConfigError::Validation(
            "engine.save_every_pages must be >= 1".to_string(),
        ));
    }

    let max_no_progress = (MAX_ENGINE_MS / 1000) as f64;
    if !(config.no_progress_timeout >= 0.0 && config.no_progress_timeout <= max_no_progress) {
        return Err(ConfigError::Validation(format!(
            "engine.no_progress_timeout must be between 0 and {} seconds, got {}",
            max_no_progress, config.no_progress_timeout
        )));
    }

    Ok(())
}
