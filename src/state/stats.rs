//! Run statistics and rate-limited progress reporting
//!
//! Counters are atomics so workers can bump them without coordination; the
//! error log and the progress watermark each sit behind their own mutex.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const PROGRESS_BAR_WIDTH: usize = 50;

/// Thread-safe crawl counters
///
/// Every counter only ever grows during a run.
#[derive(Debug)]
pub struct CrawlStats {
    pages_visited: AtomicUsize,
    error_count: AtomicUsize,
    fetches_started: AtomicUsize,
    error_log: Mutex<Vec<String>>,
    start_time: Instant,
    progress: Mutex<ProgressMark>,
}

#[derive(Debug, Default)]
struct ProgressMark {
    last_emit: Option<Instant>,
    last_pages: usize,
}

/// A point-in-time view of progress, produced when a report is due
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub pages_visited: usize,
    pub max_pages: usize,
    pub errors: usize,
    pub pages_per_minute: f64,
    pub elapsed: Duration,
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.max_pages.max(1);
        let done = self.pages_visited.min(total);
        let filled = PROGRESS_BAR_WIDTH * done / total;
        write!(
            f,
            "Progress: [{}{}] {:.1}% | {}/{} pages | {:.1} pages/min | {:.1}s",
            "=".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            done as f64 * 100.0 / total as f64,
            self.pages_visited,
            self.max_pages,
            self.pages_per_minute,
            self.elapsed.as_secs_f64()
        )
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            pages_visited: AtomicUsize::new(0),
            error_count: AtomicUsize::new(0),
            fetches_started: AtomicUsize::new(0),
            error_log: Mutex::new(Vec::new()),
            start_time: Instant::now(),
            progress: Mutex::new(ProgressMark::default()),
        }
    }

    /// Records a visited page, returning the new total
    pub fn increment_pages(&self) -> usize {
        self.pages_visited.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records an error message and bumps the error count
    pub fn add_error(&self, message: impl Into<String>) {
        self.error_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.into());
        self.error_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Claims one fetch out of the page budget
    ///
    /// Returns false once `limit` fetches have been claimed, so concurrent
    /// workers can never start more than `limit` fetches between them.
    pub fn try_reserve_fetch(&self, limit: usize) -> bool {
        self.fetches_started
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |started| {
                (started < limit).then_some(started + 1)
            })
            .is_ok()
    }

    pub fn pages_visited(&self) -> usize {
        self.pages_visited.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::SeqCst)
    }

    pub fn fetches_started(&self) -> usize {
        self.fetches_started.load(Ordering::SeqCst)
    }

    /// Pages and errors together; any change means the run made progress
    pub fn activity(&self) -> usize {
        self.pages_visited() + self.error_count()
    }

    pub fn error_log(&self) -> Vec<String> {
        self.error_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn pages_per_minute(&self) -> f64 {
        let minutes = self.elapsed().as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.pages_visited() as f64 / minutes
        } else {
            0.0
        }
    }

    /// Returns a snapshot when a progress report is due
    ///
    /// A report is due only when at least `interval` has passed since the
    /// previous one and the visited count has changed since then.
    pub fn progress_report(&self, max_pages: usize, interval: Duration) -> Option<ProgressSnapshot> {
        let pages = self.pages_visited();
        {
            let mut mark = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
            let interval_passed = mark.last_emit.map_or(true, |t| t.elapsed() >= interval);
            if !interval_passed || pages <= mark.last_pages {
                return None;
            }
            mark.last_emit = Some(Instant::now());
            mark.last_pages = pages;
        }

        Some(ProgressSnapshot {
            pages_visited: pages,
            max_pages,
            errors: self.error_count(),
            pages_per_minute: self.pages_per_minute(),
            elapsed: self.elapsed(),
        })
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}
