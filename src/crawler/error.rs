use std::path::PathBuf;
use thiserror::Error;

/// Invalid crawl configuration, reported before any work is scheduled
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no start pages were given")]
    NoSeeds,
    #[error("start page #{0} is an empty string")]
    EmptySeed(usize),
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
    #[error("parallelism must be greater than 0")]
    ZeroParallelism,
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to fetch or parse one location. Never fatal to a crawl.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to fetch page: {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse page: {0}")]
    Parse(String),
    #[error("failed to start fetch runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Errors a crawl invocation can surface to its caller
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    Scheduler(#[from] rayon::ThreadPoolBuildError),
}
