//! Timing of crawler operations.
//!
//! Operations are timed by wrapping them explicitly: either a whole call through
//! [`Profiler::time`], or every fetch of a [`DocumentFetcher`] through
//! [`Profiler::wrap`].

use chrono::{DateTime, Local};
use dashmap::DashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::crawler::{Document, DocumentFetcher, FetchError};

/// Total time spent per profiled operation
#[derive(Debug, Default)]
pub struct ProfilingState {
    data: DashMap<String, Duration>,
}

impl ProfilingState {
    pub fn record(&self, key: &str, elapsed: Duration) {
        *self.data.entry(key.to_string()).or_insert(Duration::ZERO) += elapsed;
    }

    pub fn get(&self, key: &str) -> Option<Duration> {
        self.data.get(key).map(|d| *d)
    }

    /// One `<key> took <duration>` line per operation, sorted by key
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut entries: Vec<(String, Duration)> = self
            .data
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort();
        for (key, elapsed) in entries {
            writeln!(writer, "{} took {}", key, format_duration(elapsed))?;
        }
        Ok(())
    }
}

fn format_duration(d: Duration) -> String {
    format!("{}m {}s {}ms", d.as_secs() / 60, d.as_secs() % 60, d.subsec_millis())
}

pub struct Profiler {
    start_time: DateTime<Local>,
    state: Arc<ProfilingState>,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            start_time: Local::now(),
            state: Arc::new(ProfilingState::default()),
        }
    }

    pub fn state(&self) -> &ProfilingState {
        &self.state
    }

    /// Runs `op` and records how long it took under `key`
    pub fn time<R>(&self, key: &str, op: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = op();
        self.state.record(key, start.elapsed());
        out
    }

    /// Wraps a fetcher so every `fetch` call is timed, successful or not
    pub fn wrap<F: DocumentFetcher>(&self, fetcher: F) -> ProfiledFetcher<F> {
        ProfiledFetcher {
            key: format!("{}#fetch", std::any::type_name::<F>()),
            inner: fetcher,
            state: Arc::clone(&self.state),
        }
    }

    /// Appends this run's data to `path`, or prints it when there is no path
    pub fn write_data(&self, path: Option<&Path>) -> std::io::Result<()> {
        match path {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                self.write_to(&mut file)
            }
            None => self.write_to(&mut std::io::stdout().lock()),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "Run at {}", self.start_time.to_rfc2822())?;
        self.state.write(writer)?;
        writeln!(writer)?;
        writer.flush()
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProfiledFetcher<F> {
    key: String,
    inner: F,
    state: Arc<ProfilingState>,
}

impl<F: DocumentFetcher> DocumentFetcher for ProfiledFetcher<F> {
    fn fetch(&self, location: &str) -> Result<Document, FetchError> {
        let start = Instant::now();
        let out = self.inner.fetch(location);
        self.state.record(&self.key, start.elapsed());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowFetcher;

    impl DocumentFetcher for SlowFetcher {
        fn fetch(&self, location: &str) -> Result<Document, FetchError> {
            std::thread::sleep(Duration::from_millis(5));
            if location == "bad" {
                return Err(FetchError::UnsupportedScheme("bad".into()));
            }
            Ok(Document::default())
        }
    }

    #[test]
    fn test_wrapped_fetcher_records_every_call() {
        let profiler = Profiler::new();
        let fetcher = profiler.wrap(SlowFetcher);

        assert!(fetcher.fetch("good").is_ok());
        assert!(fetcher.fetch("bad").is_err());

        let key = format!("{}#fetch", std::any::type_name::<SlowFetcher>());
        let total = profiler.state().get(&key).unwrap();
        assert!(total >= Duration::from_millis(10));
    }

    #[test]
    fn test_time_returns_result_and_records() {
        let profiler = Profiler::new();
        let value = profiler.time("ParallelCrawler#crawl", || 42);
        assert_eq!(value, 42);
        assert!(profiler.state().get("ParallelCrawler#crawl").is_some());
    }

    #[test]
    fn test_write_data_appends() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join(format!("word-crawler-profile-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let profiler = Profiler::new();
        profiler.state().record("a#fetch", Duration::from_millis(61_250));
        profiler.write_data(Some(&path))?;
        profiler.write_data(Some(&path))?;

        let written = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(written.matches("Run at ").count(), 2);
        assert_eq!(written.matches("a#fetch took 1m 1s 250ms").count(), 2);
        Ok(())
    }
}
