pub mod config;
pub mod deadline;
pub mod error;
pub mod registry;
pub mod result;
pub mod runner;
pub mod scrape;
pub mod task;
pub mod words;


pub use config::{CrawlSpec, CrawlSpecBuilder, CrawlerConfiguration, IgnorePredicate, PAGE_REQUEST_TIMEOUT_SEC};
pub use deadline::{Clock, ClockRef, ManualClock, SystemClock, TimeGate};
pub use error::{ConfigError, CrawlError, FetchError};
pub use registry::ClaimRegistry;
pub use result::{CrawlResult, write_result};
pub use runner::{ParallelCrawler, Scheduler};
pub use scrape::{Document, DocumentFetcher, PageFetcher, ScrapeOptions, construct_url, scrape_page};
pub use task::{CrawlContext, CrawlTask, RejectReason};
pub use words::{WordAggregator, WordCounts};
