/// Lifecycle phases of a crawl run
///
/// A run moves strictly forward: `Idle → Seeding → Running → Draining → Done`.
/// Seeding may skip straight to Draining when the start URL cannot be crawled
/// or a stop is requested before workers start.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Constructed, nothing fetched yet
    Idle,

    /// Loading robots.txt, checking and queueing the start URL
    Seeding,

    /// Workers are pulling from the frontier
    Running,

    /// Stop requested; in-flight iterations finish, history is flushed
    Draining,

    /// Terminal; results are final
    Done,
}

impl CrawlPhase {
    /// Returns true if the run can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true while workers may still start new iterations
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Seeding | Self::Running)
    }

    /// Checks whether moving from this phase to `next` is legal
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Seeding)
                | (Self::Seeding, Self::Running)
                | (Self::Seeding, Self::Draining)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
