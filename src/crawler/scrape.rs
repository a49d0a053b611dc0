use log2::debug;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

use super::config::PAGE_REQUEST_TIMEOUT_SEC;
use super::error::FetchError;

/// What the crawler learns from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub word_counts: HashMap<String, u64>,
    pub links: Vec<String>,
}

/// Resolves a location into its words and outgoing links.
/// Called from pool workers, so implementations block until the page is in.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, location: &str) -> Result<Document, FetchError>;
}

/// Knobs shared by every page fetch
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub request_timeout: Duration,
    /// Words fully matched by any of these are not counted
    pub ignored_words: Vec<Regex>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(PAGE_REQUEST_TIMEOUT_SEC),
            ignored_words: Vec::new(),
        }
    }
}

/// If `path` is a full URL, returns it as-is. Otherwise constructs a full URL by
/// merging with `root_url`. Trailing slashes are removed and fragments stripped.
pub fn construct_url(path: &str, root_url: Url) -> Result<Url, url::ParseError> {
    let mut url = if let Ok(parsed_url) = Url::parse(path) {
        if parsed_url.host().is_some() || parsed_url.scheme() == "file" {
            parsed_url
        } else {
            root_url.join(path)?
        }
    } else {
        root_url.join(path)?
    };

    let trimmed_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed_path);
    url.set_fragment(None);

    Ok(url)
}

fn is_followable(href: &str) -> bool {
    let href = href.trim();
    !(href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:"))
}

/// Extracts links and word counts from an HTML page
pub fn parse_page(html: &str, page_url: &Url, options: &ScrapeOptions) -> Result<Document, FetchError> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]")
        .map_err(|e| FetchError::Parse(format!("failed to parse <a> selector: {}", e)))?;
    let body_selector = Selector::parse("body")
        .map_err(|e| FetchError::Parse(format!("failed to parse <body> selector: {}", e)))?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !is_followable(href) {
            continue;
        }
        match construct_url(href.trim(), page_url.clone()) {
            Ok(link) if matches!(link.scheme(), "http" | "https" | "file") => {
                let link = link.to_string();
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
            Ok(link) => debug!("Skipped link with unsupported scheme: {}", link),
            Err(e) => debug!("Skipped malformed link {} on {}: {}", href, page_url, e),
        }
    }

    let mut word_counts = HashMap::new();
    for body in document.select(&body_selector) {
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"));
            if hidden {
                continue;
            }
            for token in text.split_whitespace() {
                if let Some(word) = normalize_word(token, &options.ignored_words) {
                    *word_counts.entry(word).or_insert(0) += 1;
                }
            }
        }
    }

    Ok(Document { word_counts, links })
}

fn normalize_word(token: &str, ignored_words: &[Regex]) -> Option<String> {
    let word: String = token
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if word.is_empty() || ignored_words.iter().any(|p| p.is_match(&word)) {
        return None;
    }
    Some(word)
}

/// Download and parse one http(s) page.
pub async fn scrape_page(url: Url, client: &Client, options: &ScrapeOptions) -> Result<Document, FetchError> {
    let response = client
        .get(url.clone())
        .timeout(options.request_timeout)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let html = response.text().await?;
    let document = parse_page(&html, &url, options)?;

    debug!(
        "Found {} links and {} distinct words on page {}",
        document.links.len(),
        document.word_counts.len(),
        url
    );

    Ok(document)
}

fn read_local_page(url: &Url, options: &ScrapeOptions) -> Result<Document, FetchError> {
    let path = url
        .to_file_path()
        .map_err(|_| FetchError::Parse(format!("{} is not a local path", url)))?;
    let html = std::fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })?;
    parse_page(&html, url, options)
}

/// Fetches `http`, `https` and `file` locations.
///
/// Network pages go through a shared async client driven by a small private runtime,
/// so pool workers can call `fetch` synchronously.
pub struct PageFetcher {
    client: Client,
    runtime: tokio::runtime::Runtime,
    options: ScrapeOptions,
}

impl PageFetcher {
    pub fn new(options: ScrapeOptions) -> Result<Self, FetchError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("page-fetcher")
            .enable_all()
            .build()
            .map_err(FetchError::Runtime)?;

        Ok(Self {
            client: Client::builder().build()?,
            runtime,
            options,
        })
    }
}

impl DocumentFetcher for PageFetcher {
    fn fetch(&self, location: &str) -> Result<Document, FetchError> {
        let url = Url::parse(location).map_err(|source| FetchError::InvalidUrl {
            url: location.to_string(),
            source,
        })?;

        match url.scheme() {
            "http" | "https" => self
                .runtime
                .block_on(scrape_page(url, &self.client, &self.options)),
            "file" => read_local_page(&url, &self.options),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
