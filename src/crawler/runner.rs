use log2::{debug, info};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::time::Instant;

use super::config::{CrawlSpec, available_parallelism};
use super::deadline::{ClockRef, SystemClock, TimeGate};
use super::error::{ConfigError, CrawlError};
use super::registry::ClaimRegistry;
use super::result::CrawlResult;
use super::scrape::DocumentFetcher;
use super::task::{CrawlContext, CrawlTask};
use super::words::WordAggregator;

/// Work-stealing fork/join pool that runs a crawl's task forest
pub struct Scheduler {
    pool: ThreadPool,
}

impl Scheduler {
    /// Sized to the lesser of `requested` and the host's hardware parallelism
    pub fn new(requested: usize) -> Result<Self, CrawlError> {
        if requested == 0 {
            return Err(ConfigError::ZeroParallelism.into());
        }
        let threads = requested.min(available_parallelism());
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("crawl-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs one task and every descendant it forks, blocking until the subtree has finished
    pub fn submit(&self, task: CrawlTask<'_>) -> bool {
        self.pool.install(|| task.run())
    }

    /// Runs every task, including all the children they fork, and blocks until the
    /// whole forest has finished. Idle workers steal from busy ones, so lopsided
    /// trees stay balanced.
    pub fn invoke_all(&self, tasks: Vec<CrawlTask<'_>>) -> Vec<bool> {
        self.pool.install(|| {
            rayon::scope(|scope| {
                tasks
                    .into_par_iter()
                    .map(|task| task.compute(scope))
                    .collect()
            })
        })
    }
}

/// Crawls from a set of seed pages in parallel, counting words on every page it visits
pub struct ParallelCrawler {
    spec: CrawlSpec,
    fetcher: Arc<dyn DocumentFetcher>,
    clock: ClockRef,
}

impl ParallelCrawler {
    pub fn new(spec: CrawlSpec, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            spec,
            fetcher,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = clock;
        self
    }

    /// Runs one crawl to completion or until the time budget runs out.
    ///
    /// Fetch failures are absorbed by the task that hit them; only a worker pool that
    /// cannot be started is reported.
    pub fn crawl(&self) -> Result<CrawlResult, CrawlError> {
        let gate = TimeGate::open(Arc::clone(&self.clock), self.spec.timeout());
        let scheduler = Scheduler::new(self.spec.parallelism())?;
        let registry = ClaimRegistry::new();
        let words = WordAggregator::new();
        let started = Instant::now();

        info!(
            "Crawling {} start page(s) to depth {} on {} worker(s), budget {:?}",
            self.spec.seeds().len(),
            self.spec.max_depth(),
            scheduler.threads(),
            self.spec.timeout()
        );

        let ctx = CrawlContext {
            gate: &gate,
            registry: &registry,
            words: &words,
            ignore: self.spec.ignore_predicate().as_ref(),
            fetcher: self.fetcher.as_ref(),
        };
        let roots = self
            .spec
            .seeds()
            .iter()
            .map(|seed| CrawlTask::new(seed.as_str(), self.spec.max_depth(), ctx))
            .collect();
        let fetched = scheduler.invoke_all(roots);

        debug!(
            "{} of {} start page(s) fetched, deadline expired: {}",
            fetched.iter().filter(|f| **f).count(),
            fetched.len(),
            gate.expired()
        );

        let result = CrawlResult {
            word_counts: words.top_k(self.spec.popular_word_count()),
            urls_visited: registry.len(),
        };

        info!(
            "Crawl finished in {:?}: {} url(s) visited, {} distinct word(s)",
            started.elapsed(),
            result.urls_visited,
            words.len()
        );

        Ok(result)
    }
}
