use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for a crawl run
///
/// Supplied once and read-only afterwards; the coordinator shares it with
/// every worker by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// What to crawl and how hard
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Absolute http(s) URL the crawl starts from; its host scopes the crawl
    pub base_url: String,

    /// Ordered, distinct values to look for on every page
    pub search_values: Vec<String>,

    /// Politeness delay after each page (seconds)
    #[serde(default = "default_sleep_time")]
    pub sleep_time: f64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Hard ceiling on the number of fetches
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum BFS distance from the start URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of parallel workers
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,

    /// Whether robots.txt is consulted before fetching
    #[serde(default = "default_true")]
    pub respect_robots: bool,
}

impl CrawlerConfig {
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs_f64(self.sleep_time)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }
}

/// Visited-URL history persistence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HistoryConfig {
    /// Whether the visited set is loaded at start and saved during the run
    #[serde(default)]
    pub enabled: bool,

    /// Path of the JSON history file (required when enabled)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Log every skip/filter decision
    #[serde(default)]
    pub verbose: bool,

    /// Write a timestamped report file at the end of the run
    #[serde(default)]
    pub export_results: bool,

    /// Directory the report file is written to
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            export_results: false,
            export_dir: default_export_dir(),
        }
    }
}

/// Scheduler tuning knobs; the defaults suit interactive use
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// How long a worker waits on an empty frontier before re-checking stop conditions
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,

    /// Supervisor polling interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive empty-and-idle observations required before the run ends
    #[serde(default = "default_idle_checks")]
    pub idle_checks: u32,

    /// History is saved every this many visited pages
    #[serde(default = "default_save_every_pages")]
    pub save_every_pages: u32,

    /// Seconds without any page or error before the run is stopped (0 disables)
    #[serde(default = "default_no_progress_timeout")]
    pub no_progress_timeout: f64,

    /// Upper bound on waiting for in-flight workers while draining
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl EngineConfig {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn no_progress_timeout(&self) -> Option<Duration> {
        (self.no_progress_timeout > 0.0).then(|| Duration::from_secs_f64(self.no_progress_timeout))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pop_timeout_ms: default_pop_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            idle_checks: default_idle_checks(),
            save_every_pages: default_save_every_pages(),
            no_progress_timeout: default_no_progress_timeout(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

fn default_sleep_time() -> f64 {
    2.0
}

fn default_timeout() -> f64 {
    10.0
}

fn default_max_pages() -> u32 {
    100
}

fn default_max_depth() -> u32 {
    5
}

fn default_max_workers() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_pop_timeout_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_idle_checks() -> u32 {
    3
}

fn default_save_every_pages() -> u32 {
    10
}

fn default_no_progress_timeout() -> f64 {
    300.0
}

fn default_drain_timeout_ms() -> u64 {
    5000
}
