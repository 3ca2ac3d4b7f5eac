//! Politeness filter
//!
//! Decides whether a URL may be fetched at all: it must stay on the start
//! URL's host, must not point at a skipped file type, and must be permitted
//! by robots.txt when a ruleset is loaded.

use crate::robots::RobotsRules;
use crate::url::{extract_domain, has_skipped_extension, same_domain, SKIP_EXTENSIONS};
use crate::UrlError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Upper bound on a robots.txt Crawl-delay
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Why a URL was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OtherDomain,
    SkippedExtension,
    RobotsDisallowed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::OtherDomain => "different domain",
            Self::SkippedExtension => "skipped file type",
            Self::RobotsDisallowed => "disallowed by robots.txt",
        };
        f.write_str(reason)
    }
}

/// Fetch-permission checks scoped to one start host
#[derive(Debug, Clone)]
pub struct PolitenessFilter {
    domain: String,
    skip_extensions: &'static [&'static str],
    robots: Option<RobotsRules>,
    robots_agent: String,
    verbose: bool,
}

impl PolitenessFilter {
    /// Creates a filter for the host of `start_url`
    ///
    /// Robots checking is off until [`set_robots`](Self::set_robots) is
    /// called with a loaded ruleset.
    pub fn new(start_url: &Url, robots_agent: impl Into<String>, verbose: bool) -> Result<Self, UrlError> {
        let domain = extract_domain(start_url).ok_or(UrlError::MissingHost)?;
        Ok(Self {
            domain,
            skip_extensions: SKIP_EXTENSIONS,
            robots: None,
            robots_agent: robots_agent.into(),
            verbose,
        })
    }

    pub fn set_robots(&mut self, rules: Option<RobotsRules>) {
        self.robots = rules;
    }

    pub fn robots_enabled(&self) -> bool {
        self.robots.is_some()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn is_fetchable(&self, url: &Url) -> bool {
        match self.check(url) {
            Ok(()) => true,
            Err(reason) => {
                self.log_skip(url.as_str(), reason);
                false
            }
        }
    }

    /// Runs every check, reporting the first that fails
    pub fn check(&self, url: &Url) -> Result<(), SkipReason> {
        if !same_domain(url, &self.domain) {
            return Err(SkipReason::OtherDomain);
        }
        if has_skipped_extension(url, self.skip_extensions) {
            return Err(SkipReason::SkippedExtension);
        }
        if !self.robots_allows(url) {
            return Err(SkipReason::RobotsDisallowed);
        }
        Ok(())
    }

    /// Robots permission alone, ignoring domain and extension
    pub fn robots_allows(&self, url: &Url) -> bool {
        self.robots
            .as_ref()
            .map_or(true, |rules| rules.is_allowed(url.as_str(), &self.robots_agent))
    }

    /// The Crawl-delay robots.txt declares for our agent, if any
    ///
    /// Values above [`MAX_CRAWL_DELAY`] are clamped to it.
    pub fn crawl_delay(&self) -> Option<Duration> {
        let secs = self
            .robots
            .as_ref()
            .and_then(|rules| rules.crawl_delay(&self.robots_agent))
            .filter(|secs| *secs > 0.0)?;

        match Duration::try_from_secs_f64(secs) {
            Ok(delay) if delay <= MAX_CRAWL_DELAY => Some(delay),
            _ => {
                tracing::warn!(
                    "robots.txt Crawl-delay of {}s is out of range, using {:?}",
                    secs,
                    MAX_CRAWL_DELAY
                );
                Some(MAX_CRAWL_DELAY)
            }
        }
    }

    fn log_skip(&self, url: &str, reason: SkipReason) {
        if self.verbose {
            tracing::info!("Skipping {}: {}", url, reason);
        } else {
            tracing::trace!("Skipping {}: {}", url, reason);
        }
    }
}
