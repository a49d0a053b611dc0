use log2::{debug, trace, warn};
use rayon::Scope;
use std::fmt;

use super::deadline::TimeGate;
use super::registry::ClaimRegistry;
use super::scrape::{Document, DocumentFetcher};
use super::words::WordAggregator;

/// Handles to everything a crawl's tasks share. Cheap to copy into every child.
#[derive(Clone, Copy)]
pub struct CrawlContext<'a> {
    pub gate: &'a TimeGate,
    pub registry: &'a ClaimRegistry,
    pub words: &'a WordAggregator,
    pub ignore: &'a (dyn Fn(&str) -> bool + Send + Sync),
    pub fetcher: &'a dyn DocumentFetcher,
}

/// Why a task did no work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DepthExhausted,
    DeadlineExpired,
    Ignored,
    AlreadyClaimed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::DepthExhausted => "depth exhausted",
            RejectReason::DeadlineExpired => "deadline expired",
            RejectReason::Ignored => "ignored",
            RejectReason::AlreadyClaimed => "already visited",
        };
        write!(f, "{}", s)
    }
}

/// Where a task is in its life
pub enum TaskState<'a> {
    NotStarted,
    Rejected(RejectReason),
    Claimed,
    Fetching,
    Merging(Document),
    Spawning(Vec<String>),
    Joining(Vec<CrawlTask<'a>>),
    Done { children: usize },
}

impl TaskState<'_> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Rejected(_) | TaskState::Done { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            TaskState::NotStarted => "not started",
            TaskState::Rejected(_) => "rejected",
            TaskState::Claimed => "claimed",
            TaskState::Fetching => "fetching",
            TaskState::Merging(_) => "merging",
            TaskState::Spawning(_) => "spawning",
            TaskState::Joining(_) => "joining",
            TaskState::Done { .. } => "done",
        }
    }
}

/// Visit of one location with `depth` levels left to explore
pub struct CrawlTask<'a> {
    location: String,
    depth: usize,
    ctx: CrawlContext<'a>,
}

impl fmt::Debug for CrawlTask<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlTask")
            .field("location", &self.location)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<'a> CrawlTask<'a> {
    pub fn new(location: impl Into<String>, depth: usize, ctx: CrawlContext<'a>) -> Self {
        Self {
            location: location.into(),
            depth,
            ctx,
        }
    }

    /// Runs the task and its whole subtree on the current pool, blocking until the
    /// subtree has finished. Returns true if this task fetched its location.
    pub fn run(self) -> bool {
        rayon::scope(|scope| self.compute(scope))
    }

    /// Runs the task and hands its children to `scope`, which joins them.
    ///
    /// Children are spawned rather than run inside this call, so a worker's stack stays
    /// flat however deep the link chain goes. Returns true if this task fetched its location.
    pub fn compute<'s>(self, scope: &Scope<'s>) -> bool
    where
        'a: 's,
    {
        let mut state = TaskState::NotStarted;
        while !state.is_terminal() {
            state = self.step(state, scope);
        }
        matches!(state, TaskState::Done { .. })
    }

    fn step<'s>(&self, state: TaskState<'a>, scope: &Scope<'s>) -> TaskState<'a>
    where
        'a: 's,
    {
        let next = match state {
            TaskState::NotStarted => match self.admit() {
                Ok(()) => TaskState::Claimed,
                Err(reason) => {
                    debug!("Skipping {} at depth {}: {}", self.location, self.depth, reason);
                    TaskState::Rejected(reason)
                }
            },
            TaskState::Claimed => TaskState::Fetching,
            TaskState::Fetching => match self.ctx.fetcher.fetch(&self.location) {
                Ok(document) => TaskState::Merging(document),
                Err(e) => {
                    warn!("Failed to fetch {}: {}", self.location, e);
                    TaskState::Done { children: 0 }
                }
            },
            TaskState::Merging(Document { word_counts, links }) => {
                self.ctx.words.merge(word_counts);
                TaskState::Spawning(links)
            }
            TaskState::Spawning(links) => TaskState::Joining(
                links
                    .into_iter()
                    .map(|link| CrawlTask::new(link, self.depth - 1, self.ctx))
                    .collect(),
            ),
            TaskState::Joining(children) => {
                let count = children.len();
                for child in children {
                    scope.spawn(move |scope| {
                        child.compute(scope);
                    });
                }
                TaskState::Done { children: count }
            }
            terminal => terminal,
        };
        match &next {
            TaskState::Done { children } => {
                trace!("{} at depth {} -> done, {} child task(s)", self.location, self.depth, children);
            }
            other => {
                trace!("{} at depth {} -> {}", self.location, self.depth, other.label());
            }
        }
        next
    }

    /// Admission checks, in order: depth, deadline, ignore list, claim
    fn admit(&self) -> Result<(), RejectReason> {
        if self.depth == 0 {
            return Err(RejectReason::DepthExhausted);
        }
        if self.ctx.gate.expired() {
            return Err(RejectReason::DeadlineExpired);
        }
        if (self.ctx.ignore)(self.location.as_str()) {
            return Err(RejectReason::Ignored);
        }
        if !self.ctx.registry.try_claim(&self.location) {
            return Err(RejectReason::AlreadyClaimed);
        }
        Ok(())
    }
}
