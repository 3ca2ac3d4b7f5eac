//! Crawl frontier
//!
//! FIFO queue of `(url, depth)` entries plus the sets that guarantee each URL
//! is scheduled at most once. The queue, the queued set, the visited set and
//! the URLs currently being worked on share one lock so that a consistent
//! "nothing queued and nothing in flight" snapshot can be taken at any time.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

/// A URL waiting to be fetched, with its BFS distance from the start URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    /// Popped but not yet finished
    active: HashSet<String>,
    closed: bool,
}

/// Shared frontier with a bounded-wait pop
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
}

/// An entry handed to a worker
///
/// While the guard lives the URL counts as in flight and cannot be queued
/// again. Dropping it ends the in-flight period; whether the URL is then
/// considered visited depends on [`Frontier::mark_visited`] having been called.
#[derive(Debug)]
pub struct InFlight<'a> {
    frontier: &'a Frontier,
    entry: FrontierEntry,
}

impl InFlight<'_> {
    pub fn url(&self) -> &Url {
        &self.entry.url
    }

    pub fn depth(&self) -> u32 {
        self.entry.depth
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.frontier.finish(self.entry.url.as_str());
    }
}

impl Frontier {
    /// Creates a frontier whose visited set is pre-populated (from history)
    pub fn new(visited: HashSet<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                visited,
                ..Inner::default()
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a URL unless it is visited, queued or in flight
    ///
    /// # Returns
    ///
    /// `true` if the entry was added.
    pub fn push(&self, url: Url, depth: u32) -> bool {
        {
            let mut inner = self.lock();
            let key = url.as_str();
            if inner.closed
                || inner.visited.contains(key)
                || inner.queued.contains(key)
                || inner.active.contains(key)
            {
                return false;
            }
            inner.queued.insert(key.to_string());
            inner.queue.push_back(FrontierEntry { url, depth });
        }
        self.notify.notify_one();
        true
    }

    /// Takes the next entry, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` on timeout or once the frontier is closed, so callers
    /// get a chance to re-check their stop conditions.
    pub async fn pop(&self, timeout: Duration) -> Option<InFlight<'_>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push in between is not missed
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(entry) = inner.queue.pop_front() {
                    let key = entry.url.as_str().to_string();
                    inner.queued.remove(&key);
                    inner.active.insert(key);
                    return Some(InFlight {
                        frontier: self,
                        entry,
                    });
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    fn finish(&self, url: &str) {
        self.lock().active.remove(url);
    }

    /// Records a URL as fetched or permanently skipped
    ///
    /// # Returns
    ///
    /// `true` if the URL was not visited before.
    pub fn mark_visited(&self, url: &Url) -> bool {
        self.lock().visited.insert(url.as_str().to_string())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(url.as_str())
    }

    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// A copy of the visited set, taken under the frontier lock
    pub fn visited_snapshot(&self) -> HashSet<String> {
        self.lock().visited.clone()
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of popped entries whose guard is still alive
    pub fn in_flight(&self) -> usize {
        self.lock().active.len()
    }

    /// True when nothing is queued and no worker holds an entry
    pub fn is_idle(&self) -> bool {
        let inner = self.lock();
        inner.queue.is_empty() && inner.active.is_empty()
    }

    /// Stops the frontier: drops queued entries and wakes blocked pops
    ///
    /// Entries already handed out stay in flight until their guards drop.
    pub fn close(&self) {
        {
            let mut inner = self.lock();
            inner.closed = true;
            inner.queue.clear();
            inner.queued.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
