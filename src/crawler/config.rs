use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::error::ConfigError;

/// Default timeout for page requests in seconds
pub const PAGE_REQUEST_TIMEOUT_SEC: u64 = 2;

/// Decides whether a location must be skipped
pub type IgnorePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Number of threads the host can run in parallel
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Crawl configuration as written in the JSON configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlerConfiguration {
    pub start_pages: Vec<String>,
    pub ignored_urls: Vec<String>,
    pub ignored_words: Vec<String>,
    pub parallelism: Option<i64>,
    pub max_depth: i64,
    pub timeout_seconds: i64,
    pub popular_word_count: i64,
    pub profile_output_path: Option<PathBuf>,
    pub result_path: Option<PathBuf>,
}

impl CrawlerConfiguration {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validates the file contents and turns them into a `CrawlSpec`
    pub fn to_spec(&self) -> Result<CrawlSpec, ConfigError> {
        let parallelism = match self.parallelism {
            Some(p) => non_negative("parallelism", p)?,
            None => available_parallelism(),
        };

        CrawlSpec::builder(self.start_pages.clone())
            .with_max_depth(non_negative("maxDepth", self.max_depth)?)
            .with_timeout(Duration::from_secs(non_negative(
                "timeoutSeconds",
                self.timeout_seconds,
            )? as u64))
            .with_popular_word_count(non_negative("popularWordCount", self.popular_word_count)?)
            .with_parallelism(parallelism)
            .with_ignored_urls(&self.ignored_urls)?
            .build()
    }

    pub fn ignored_word_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        compile_patterns(&self.ignored_words)
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::Negative { field, value })
}

/// Compiles patterns that must match a whole string
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Everything one crawl invocation needs. Immutable once built.
#[derive(Clone)]
pub struct CrawlSpec {
    seeds: Vec<String>,
    max_depth: usize,
    timeout: Duration,
    popular_word_count: usize,
    parallelism: usize,
    ignore: IgnorePredicate,
}

impl CrawlSpec {
    pub fn builder(seeds: Vec<String>) -> CrawlSpecBuilder {
        CrawlSpecBuilder {
            seeds,
            max_depth: 3,
            timeout: Duration::from_secs(PAGE_REQUEST_TIMEOUT_SEC * 10),
            popular_word_count: 10,
            parallelism: available_parallelism(),
            ignore: Arc::new(|_: &str| false),
        }
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn popular_word_count(&self) -> usize {
        self.popular_word_count
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn is_ignored(&self, location: &str) -> bool {
        (self.ignore)(location)
    }

    pub fn ignore_predicate(&self) -> &IgnorePredicate {
        &self.ignore
    }
}

impl fmt::Debug for CrawlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlSpec")
            .field("seeds", &self.seeds)
            .field("max_depth", &self.max_depth)
            .field("timeout", &self.timeout)
            .field("popular_word_count", &self.popular_word_count)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

pub struct CrawlSpecBuilder {
    seeds: Vec<String>,
    max_depth: usize,
    timeout: Duration,
    popular_word_count: usize,
    parallelism: usize,
    ignore: IgnorePredicate,
}

impl CrawlSpecBuilder {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_popular_word_count(mut self, count: usize) -> Self {
        self.popular_word_count = count;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_ignore<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.ignore = Arc::new(predicate);
        self
    }

    /// Ignores every location fully matched by one of `patterns`
    pub fn with_ignored_urls(self, patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = compile_patterns(patterns)?;
        Ok(self.with_ignore(move |location| patterns.iter().any(|p| p.is_match(location))))
    }

    pub fn build(self) -> Result<CrawlSpec, ConfigError> {
        if self.seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }
        if let Some(index) = self.seeds.iter().position(|seed| seed.trim().is_empty()) {
            return Err(ConfigError::EmptySeed(index));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }

        Ok(CrawlSpec {
            seeds: self.seeds,
            max_depth: self.max_depth,
            timeout: self.timeout,
            popular_word_count: self.popular_word_count,
            parallelism: self.parallelism,
            ignore: self.ignore,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_from_json() -> Result<(), Box<dyn std::error::Error>> {
        let cfg = CrawlerConfiguration::from_json(
            r#"{
                "startPages": ["http://localhost/a", "http://localhost/b"],
                "ignoredUrls": ["http://localhost/private/.*"],
                "ignoredWords": ["^.{1,3}$"],
                "parallelism": 4,
                "maxDepth": 5,
                "timeoutSeconds": 2,
                "popularWordCount": 3,
                "resultPath": "result.json",
                "implementationOverride": "ignored"
            }"#,
        )?;
        assert_eq!(cfg.start_pages.len(), 2);
        assert_eq!(cfg.result_path, Some(PathBuf::from("result.json")));
        assert_eq!(cfg.profile_output_path, None);

        let spec = cfg.to_spec()?;
        assert_eq!(spec.seeds(), &["http://localhost/a", "http://localhost/b"]);
        assert_eq!(spec.max_depth(), 5);
        assert_eq!(spec.timeout(), Duration::from_secs(2));
        assert_eq!(spec.popular_word_count(), 3);
        assert_eq!(spec.parallelism(), 4);
        assert!(spec.is_ignored("http://localhost/private/x"));
        assert!(!spec.is_ignored("http://localhost/a"));
        Ok(())
    }

    #[test]
    fn test_missing_parallelism_uses_hardware() -> Result<(), Box<dyn std::error::Error>> {
        let cfg = CrawlerConfiguration::from_json(r#"{"startPages": ["http://localhost"]}"#)?;
        assert_eq!(cfg.to_spec()?.parallelism(), available_parallelism());
        Ok(())
    }

    #[test]
    fn test_negative_depth_is_rejected() {
        let cfg = CrawlerConfiguration {
            start_pages: vec!["http://localhost".to_string()],
            max_depth: -1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.to_spec(),
            Err(ConfigError::Negative { field: "maxDepth", value: -1 })
        ));
    }

    #[test]
    fn test_invalid_specs_are_rejected() {
        assert!(matches!(CrawlSpec::builder(vec![]).build(), Err(ConfigError::NoSeeds)));
        assert!(matches!(
            CrawlSpec::builder(vec!["a".into(), " ".into()]).build(),
            Err(ConfigError::EmptySeed(1))
        ));
        assert!(matches!(
            CrawlSpec::builder(vec!["a".into()]).with_parallelism(0).build(),
            Err(ConfigError::ZeroParallelism)
        ));
        assert!(matches!(
            CrawlSpec::builder(vec!["a".into()]).with_ignored_urls(&["(".to_string()]),
            Err(ConfigError::Pattern { .. })
        ));
    }

    #[test]
    fn test_ignored_urls_must_match_whole_location() -> Result<(), Box<dyn std::error::Error>> {
        let spec = CrawlSpec::builder(vec!["a".into()])
            .with_ignored_urls(&["http://example\\.com/b".to_string()])?
            .build()?;
        assert!(spec.is_ignored("http://example.com/b"));
        assert!(!spec.is_ignored("http://example.com/bb"));
        assert!(!spec.is_ignored("xhttp://example.com/b"));
        Ok(())
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            CrawlerConfiguration::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
