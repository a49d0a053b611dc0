use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::crawler::CrawlerConfiguration;
/// Log levels as defined in log2 crate
#[derive(Debug, Serialize, Deserialize, Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}
/// Program arguments. What to crawl lives in the JSON file `config` points to,
/// see `crawler::CrawlerConfiguration`.
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Path to the JSON crawl configuration
    pub config: PathBuf,
    /// Overrides the configured number of worker threads
    #[arg(short, long)]
    pub parallelism: Option<usize>,
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.parallelism == Some(0) {
            anyhow::bail!("parallelism must be greater than 0");
        }
        if !self.config.is_file() {
            anyhow::bail!("configuration file {:?} does not exist", self.config);
        }
        Ok(())
    }

    /// Applies command line overrides on top of the loaded crawl configuration
    pub fn apply_overrides(&self, crawl_cfg: &mut CrawlerConfiguration) -> anyhow::Result<()> {
        if let Some(parallelism) = self.parallelism {
            crawl_cfg.parallelism = Some(i64::try_from(parallelism)?);
        }
        Ok(())
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}
