//! Crawler coordinator - main crawl orchestration logic
//!
//! [`WebCrawler`] owns every piece of a run and drives it through
//! `Idle -> Seeding -> Running -> Draining -> Done`:
//! - Seeding loads robots.txt, checks the start URL and fetches it once
//! - Running spawns the worker tasks and supervises the stop conditions
//! - Draining stops the workers, waits for in-flight pages and saves history

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, Fetcher, Page, RequestHeaders};
use crate::crawler::filter::PolitenessFilter;
use crate::crawler::frontier::{Frontier, InFlight};
use crate::crawler::parser::{analyze_page, LinkScope, PageAnalysis};
use crate::output::{CrawlReport, MatchRecord, TerminationReason};
use crate::robots::fetch_robots;
use crate::search::{expand_criteria, SearchCriterion, SearchKind};
use crate::state::{CrawlPhase, CrawlStats, HistoryStore};
use crate::url::normalize_url;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use url::Url;

/// Called with `(pages_visited, max_pages)` whenever progress is reported
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Requests a running crawl to stop
///
/// Cloneable and usable from any task or thread. Stopping is cooperative:
/// workers finish the page they are on and the run ends with
/// [`TerminationReason::Cancelled`] and a normal, possibly partial, report.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    frontier: Arc<Frontier>,
    wake: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.frontier.close();
        self.wake.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// State shared by the workers and the supervisor
struct Shared {
    config: Config,
    criteria: Vec<SearchCriterion>,
    filter: PolitenessFilter,
    fetcher: Arc<Fetcher>,
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
    results: Mutex<BTreeMap<String, Vec<MatchRecord>>>,
    found: Mutex<BTreeSet<String>>,
    history: Option<HistoryStore>,
    stop: StopHandle,
    /// The start page fetched during seeding, consumed by the first worker to pop it
    seed_page: Mutex<Option<Page>>,
    delay: Duration,
    progress: Option<ProgressCallback>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Domain-scoped crawler that searches every page for the configured values
pub struct WebCrawler {
    config: Config,
    start_url: Url,
    criteria: Vec<SearchCriterion>,
    headers: RequestHeaders,
    filter: PolitenessFilter,
    fetcher: Arc<Fetcher>,
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
    history: Option<HistoryStore>,
    stop: StopHandle,
    progress: Option<ProgressCallback>,
    phase: CrawlPhase,
}

impl WebCrawler {
    /// Creates a crawler, loading the visited history when it is enabled
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(WebCrawler)` - Ready to [`run`](Self::run)
    /// * `Err(Error)` - Invalid configuration or HTTP client construction failure
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::init(config, true)
    }

    /// Like [`new`](Self::new) but ignores any existing history file
    ///
    /// History is still written during the run when enabled.
    pub fn fresh(config: Config) -> Result<Self, Error> {
        Self::init(config, false)
    }

    fn init(config: Config, load_history: bool) -> Result<Self, Error> {
        validate(&config)?;

        let start_url = normalize_url(&config.crawler.base_url)?;
        let criteria = expand_criteria(&config.crawler.search_values);
        let headers = RequestHeaders::default();
        let client = build_http_client(&headers, config.crawler.timeout_duration())?;
        let filter = PolitenessFilter::new(&start_url, headers.robots_token(), config.output.verbose)?;

        let history = match (&config.history.file, config.history.enabled) {
            (Some(path), true) => Some(HistoryStore::new(path)),
            _ => None,
        };

        let visited = match &history {
            Some(store) if load_history => match store.load() {
                Ok(visited) => {
                    tracing::info!(
                        "Loaded {} previously visited URLs from {}",
                        visited.len(),
                        store.path().display()
                    );
                    visited
                }
                Err(e) => {
                    tracing::warn!("{}; continuing without history", e);
                    HashSet::new()
                }
            },
            _ => HashSet::new(),
        };

        let stats = Arc::new(CrawlStats::new());
        let frontier = Arc::new(Frontier::new(visited));
        let stop = StopHandle {
            flag: Arc::new(AtomicBool::new(false)),
            frontier: Arc::clone(&frontier),
            wake: Arc::new(Notify::new()),
        };

        Ok(Self {
            fetcher: Arc::new(Fetcher::new(client, Arc::clone(&stats))),
            config,
            start_url,
            criteria,
            headers,
            filter,
            frontier,
            stats,
            history,
            stop,
            progress: None,
            phase: CrawlPhase::Idle,
        })
    }

    /// Registers a callback invoked alongside each progress report
    ///
    /// A panicking callback is caught and logged; it never stops the run.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn user_agent(&self) -> &str {
        &self.headers.user_agent
    }

    fn advance(&mut self, next: CrawlPhase) {
        if self.phase.can_transition_to(next) {
            tracing::debug!("Crawl phase {} -> {}", self.phase, next);
            self.phase = next;
        } else {
            tracing::warn!("Ignoring invalid phase transition {} -> {}", self.phase, next);
        }
    }

    /// Runs the crawl to completion
    ///
    /// Never fails once called: fetch, parse, robots and history problems
    /// are recovered locally and show up in the report's error statistics.
    pub async fn run(mut self) -> CrawlReport {
        tracing::info!(
            "Starting crawl of {} for {} value(s) with {} worker(s)",
            self.start_url,
            self.config.crawler.search_values.len(),
            self.config.crawler.max_workers
        );

        self.advance(CrawlPhase::Seeding);
        let seeded = self.seed().await;
        tracing::debug!(
            "Scope is {}, robots.txt checking {}",
            self.filter.domain(),
            if self.filter.robots_enabled() { "on" } else { "off" }
        );

        let shared = Arc::new(self.share());

        let termination = match seeded {
            Err(reason) => {
                self.advance(CrawlPhase::Draining);
                reason
            }
            Ok(page) => {
                *lock(&shared.seed_page) = Some(page);
                self.frontier.push(self.start_url.clone(), 0);
                self.advance(CrawlPhase::Running);

                let workers: Vec<JoinHandle<()>> = (0..self.config.crawler.max_workers)
                    .map(|id| tokio::spawn(worker(Arc::clone(&shared), id)))
                    .collect();

                let reason = supervise(&shared).await;
                tracing::info!("{}, stopping crawl", reason.description());

                self.advance(CrawlPhase::Draining);
                shared.stop.stop();
                drain(workers, self.config.engine.drain_timeout()).await;
                reason
            }
        };

        shared.save_history();
        self.advance(CrawlPhase::Done);

        let report = shared.report(&self.start_url, termination);
        tracing::info!(
            "Crawl finished ({}): {} pages visited, {} errors, {}/{} values found in {:.1}s",
            report.termination,
            report.pages_visited,
            report.error_count,
            report.found_values.len(),
            report.search_values.len(),
            report.elapsed_secs
        );
        report
    }

    /// Moves the run state workers need into a [`Shared`] block
    fn share(&mut self) -> Shared {
        Shared {
            delay: self.effective_delay(),
            config: self.config.clone(),
            criteria: std::mem::take(&mut self.criteria),
            filter: self.filter.clone(),
            fetcher: Arc::clone(&self.fetcher),
            frontier: Arc::clone(&self.frontier),
            stats: Arc::clone(&self.stats),
            results: Mutex::new(BTreeMap::new()),
            found: Mutex::new(BTreeSet::new()),
            history: self.history.take(),
            stop: self.stop.clone(),
            seed_page: Mutex::new(None),
            progress: self.progress.take(),
        }
    }

    /// Verifies the start URL and fetches it once
    ///
    /// The fetched page is handed to the first worker so the start URL is
    /// never requested twice.
    async fn seed(&mut self) -> Result<Page, TerminationReason> {
        if self.config.crawler.respect_robots {
            match fetch_robots(self.fetcher.client(), &self.start_url).await {
                Ok(rules) => self.filter.set_robots(Some(rules)),
                Err(e) => tracing::warn!("{}; robots.txt checking disabled", e),
            }
        }

        if self.frontier.is_visited(&self.start_url) {
            tracing::warn!("{} is already in the visited history", self.start_url);
            return Err(TerminationReason::AlreadyVisited);
        }

        if !self.filter.robots_allows(&self.start_url) {
            tracing::warn!("{} is blocked by robots.txt", self.start_url);
            return Err(TerminationReason::StartDisallowed);
        }

        if self.stop.is_stopped() {
            return Err(TerminationReason::Cancelled);
        }

        let max_pages = self.config.crawler.max_pages as usize;
        if !self.stats.try_reserve_fetch(max_pages) {
            return Err(TerminationReason::PageBudgetReached);
        }

        match self.fetcher.fetch(&self.start_url).await {
            Ok(page) => Ok(page),
            Err(_) => {
                self.frontier.mark_visited(&self.start_url);
                Err(TerminationReason::StartUnreachable)
            }
        }
    }

    /// The configured sleep time, raised to robots.txt's Crawl-delay if larger
    fn effective_delay(&self) -> Duration {
        let configured = self.config.crawler.sleep_duration();
        match self.filter.crawl_delay() {
            Some(robots) if robots > configured => {
                tracing::info!("Using robots.txt Crawl-delay of {:?}", robots);
                robots
            }
            _ => configured,
        }
    }
}

impl Shared {
    fn stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    fn max_pages(&self) -> usize {
        self.config.crawler.max_pages as usize
    }

    fn all_found(&self) -> bool {
        lock(&self.found).len() >= self.config.crawler.search_values.len()
    }

    fn budget_exhausted(&self) -> bool {
        self.stats.fetches_started() >= self.max_pages()
    }

    /// True once every reserved fetch has been fully processed
    fn budget_settled(&self) -> bool {
        if !self.budget_exhausted() {
            return false;
        }
        let seed_pending = lock(&self.seed_page).is_some();
        !seed_pending && self.frontier.in_flight() == 0
    }

    fn take_seed_page(&self, url: &Url) -> Option<Page> {
        let mut slot = lock(&self.seed_page);
        if slot.as_ref().map_or(false, |page| &page.url == url) {
            slot.take()
        } else {
            None
        }
    }

    /// Gets the page for an entry, from the seed slot or the network
    ///
    /// Returns `None` when the page budget is used up or the fetch failed;
    /// a failed URL is marked visited so it is not retried.
    async fn obtain_page(&self, entry: &InFlight<'_>) -> Option<Page> {
        if let Some(page) = self.take_seed_page(entry.url()) {
            return Some(page);
        }

        if !self.stats.try_reserve_fetch(self.max_pages()) {
            tracing::trace!("Page budget used up, dropping {}", entry.url());
            return None;
        }

        match self.fetcher.fetch(entry.url()).await {
            Ok(page) => Some(page),
            Err(_) => {
                self.frontier.mark_visited(entry.url());
                None
            }
        }
    }

    /// Searches a fetched page and merges what it found into the run state
    ///
    /// Returns whether a value was newly found by this page.
    fn process_page(&self, entry: &InFlight<'_>, page: &Page) -> bool {
        let url = entry.url();
        let want_links = !self.stopped() && !self.all_found() && !self.budget_exhausted();
        let scope = want_links.then_some(LinkScope {
            depth: entry.depth(),
            max_depth: self.config.crawler.max_depth,
        });

        let analysis = match analyze_page(page, &self.criteria, &self.filter, scope) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("{}", e);
                PageAnalysis::default()
            }
        };

        let newly_found = self.merge_matches(url, &analysis);

        if !self.stopped() && !self.all_found() {
            let queued = analysis
                .links
                .into_iter()
                .filter(|link| self.frontier.push(link.url.clone(), link.depth))
                .count();
            tracing::debug!("{} new link(s) queued from {}", queued, url);
        }

        newly_found
    }

    fn merge_matches(&self, url: &Url, analysis: &PageAnalysis) -> bool {
        let mut text_hits = Vec::new();
        {
            let mut results = lock(&self.results);
            for criterion in &self.criteria {
                let key = criterion.key();
                let records = results.entry(key.clone()).or_default();
                let Some(matches) = analysis.matches.get(&key) else {
                    continue;
                };
                if matches.is_empty() {
                    continue;
                }
                records.extend(matches.iter().cloned().map(|node| MatchRecord::new(url.as_str(), node)));
                if self.config.output.verbose {
                    tracing::info!("{} match(es) for {} on {}", matches.len(), key, url);
                }
                if criterion.kind == SearchKind::Text {
                    text_hits.push(criterion.value.clone());
                }
            }
        }

        let mut newly_found = false;
        let mut found = lock(&self.found);
        for value in text_hits {
            if found.insert(value.clone()) {
                newly_found = true;
                tracing::info!(
                    "Found value '{}' on {} ({}/{} found)",
                    value,
                    url,
                    found.len(),
                    self.config.crawler.search_values.len()
                );
            }
        }
        newly_found
    }

    fn report_progress(&self) {
        let Some(snapshot) = self.stats.progress_report(self.max_pages(), self.delay) else {
            return;
        };
        tracing::info!("{}", snapshot);

        if let Some(callback) = &self.progress {
            let (pages, max) = (snapshot.pages_visited, snapshot.max_pages);
            if catch_unwind(AssertUnwindSafe(|| callback(pages, max))).is_err() {
                tracing::warn!("Progress callback panicked");
            }
        }
    }

    /// Saves the visited set if it grew since the last save
    fn save_history(&self) {
        let Some(store) = &self.history else {
            return;
        };
        // Snapshot under the frontier lock, then write under the history lock
        let snapshot = self.frontier.visited_snapshot();
        match store.save(&snapshot) {
            Ok(true) => tracing::debug!("History saved ({} URLs)", snapshot.len()),
            Ok(false) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }

    async fn politeness_sleep(&self) {
        if self.delay.is_zero() || self.stopped() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = self.stop.wake.notified() => {}
        }
    }

    fn report(&self, start_url: &Url, termination: TerminationReason) -> CrawlReport {
        let mut report = CrawlReport::empty(
            start_url.as_str(),
            &self.config.crawler.search_values,
            termination,
        );
        for (key, records) in lock(&self.results).iter() {
            report.results.insert(key.clone(), records.clone());
        }
        report.found_values = lock(&self.found).clone();
        report.pages_visited = self.stats.pages_visited();
        report.error_count = self.stats.error_count();
        report.error_log = self.stats.error_log();
        report.visited_urls = self.frontier.visited_count();
        report.elapsed_secs = self.stats.elapsed().as_secs_f64();
        report
    }
}

/// One worker loop: pop, fetch, search, enqueue, mark visited, sleep
async fn worker(shared: Arc<Shared>, id: u32) {
    tracing::debug!("Worker {} started", id);
    let pop_timeout = shared.config.engine.pop_timeout();
    let save_every = shared.config.engine.save_every_pages.max(1) as usize;

    loop {
        if shared.stopped() || shared.all_found() {
            break;
        }

        let Some(entry) = shared.frontier.pop(pop_timeout).await else {
            continue;
        };

        if shared.stopped() {
            break;
        }
        if shared.frontier.is_visited(entry.url()) {
            continue;
        }
        if !shared.filter.is_fetchable(entry.url()) {
            shared.frontier.mark_visited(entry.url());
            continue;
        }

        let Some(page) = shared.obtain_page(&entry).await else {
            continue;
        };

        let newly_found = if shared.stopped() {
            false
        } else {
            shared.process_page(&entry, &page)
        };

        shared.frontier.mark_visited(entry.url());
        let pages = shared.stats.increment_pages();
        drop(entry);

        if newly_found || pages % save_every == 0 {
            shared.save_history();
        }
        shared.report_progress();
        shared.politeness_sleep().await;
    }

    tracing::debug!("Worker {} stopped", id);
}

/// Polls the stop conditions until one holds
async fn supervise(shared: &Shared) -> TerminationReason {
    let engine = &shared.config.engine;
    let poll = engine.poll_interval();
    let no_progress = engine.no_progress_timeout();
    let idle_checks = engine.idle_checks.max(1);

    let mut idle_count = 0;
    let mut last_activity = shared.stats.activity();
    let mut last_change = Instant::now();

    loop {
        if shared.stopped() {
            return TerminationReason::Cancelled;
        }
        if shared.all_found() {
            return TerminationReason::AllValuesFound;
        }
        // Wait for the last page to be searched before declaring the budget spent
        if shared.budget_settled() {
            return TerminationReason::PageBudgetReached;
        }

        if shared.frontier.is_idle() {
            idle_count += 1;
            if idle_count >= idle_checks {
                return TerminationReason::FrontierExhausted;
            }
        } else {
            idle_count = 0;
        }

        let activity = shared.stats.activity();
        if activity != last_activity {
            last_activity = activity;
            last_change = Instant::now();
        } else if let Some(timeout) = no_progress {
            if last_change.elapsed() >= timeout {
                tracing::warn!(
                    "No pages visited for {:?} ({}/{} pages, {} queued, {} in flight)",
                    timeout,
                    shared.stats.pages_visited(),
                    shared.max_pages(),
                    shared.frontier.len(),
                    shared.frontier.in_flight()
                );
                return TerminationReason::NoProgress;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            _ = shared.stop.wake.notified() => {}
        }
    }
}

/// Waits for workers to exit, giving up after `timeout`
async fn drain(workers: Vec<JoinHandle<()>>, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    for handle in workers {
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Worker task failed: {}", e),
            Err(_) => {
                tracing::warn!("Workers still busy after {:?}; not waiting further", timeout);
                break;
            }
        }
    }
}

/// Runs the main crawl operation
///
/// # Arguments
///
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran (possibly ending early, see
///   [`CrawlReport::termination`])
/// * `Err(Error)` - The configuration was rejected before any request
///
/// # Example
///
/// ```no_run
/// use wheres_my_value::config::load_config;
/// use wheres_my_value::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("crawl.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{:?}", report.summary());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> crate::Result<CrawlReport> {
    Ok(WebCrawler::new(config)?.run().await)
}
