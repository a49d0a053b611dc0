use log2::*;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use word_crawler::config;
use word_crawler::crawler::{self, CrawlerConfiguration, PageFetcher, ParallelCrawler, ScrapeOptions};
use word_crawler::profiler::Profiler;

/// Indicates start time of a project, lazily initialized
pub static START_TIME: once_cell::sync::Lazy<Instant> = once_cell::sync::Lazy::new(Instant::now);

fn main() -> Result<()> {
    let _ = *START_TIME;
    let cfg = config::Config::new();
    cfg.validate()?;
    let _log2 = stdout()
        .module(true) // include module name
        .module_with_line(true) // include line number from module
        .module_filter(|module| module.starts_with("word_crawler")) // include only modules having this pattern
        .compress(false) // compress output
        .level(cfg.log_level.to_string()) // level of logging (trace -
        .start();

    let mut crawl_cfg = CrawlerConfiguration::load(&cfg.config)?;
    cfg.apply_overrides(&mut crawl_cfg)?;
    let spec = crawl_cfg.to_spec()?;
    debug!("Loaded {:?}", spec);

    let profiler = Profiler::new();
    let fetcher = PageFetcher::new(ScrapeOptions {
        ignored_words: crawl_cfg.ignored_word_patterns()?,
        ..Default::default()
    })?;
    let crawler = ParallelCrawler::new(spec, Arc::new(profiler.wrap(fetcher)));

    let result = profiler.time("ParallelCrawler#crawl", || crawler.crawl())?;
    info!(
        "Visited {} url(s) in {:?}",
        result.urls_visited,
        START_TIME.elapsed()
    );

    crawler::write_result(&result, crawl_cfg.result_path.as_deref())?;
    if let Some(path) = &crawl_cfg.result_path {
        info!("Result written to {:?}", path);
    }
    profiler.write_data(crawl_cfg.profile_output_path.as_deref())?;

    Ok(())
}
