//! Crawler backends
//!
//! A crawler produces raw cookie records and per-page storage snapshots.
//! Backends are selected through [`CrawlerBackend`] and share the
//! [`Crawler`] interface.

#[cfg_attr(not(feature = "webdriver"), allow(dead_code))]
pub mod consent;
pub mod replay;
#[cfg(feature = "webdriver")]
pub mod webdriver;

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crumb_core::{Cookie, StorageSnapshot};

pub use replay::ReplayCrawler;
#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverCrawler;

/// Cookies and storage from one crawl phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub storage: StorageSnapshot,
}

/// Result of a crawl. `pre_consent` is set when the crawler captured the
/// start page before interacting with the consent banner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlOutput {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub storage: StorageSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_consent: Option<Capture>,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("cannot read capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid capture {path}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("the replay backend needs a capture file (--capture)")]
    MissingCapture,
    #[error("crumb was built without the '{0}' feature")]
    BackendUnavailable(&'static str),
    #[error("browser driver error: {0}")]
    Driver(String),
}

pub trait Crawler {
    fn crawl(&mut self) -> Result<CrawlOutput, CrawlError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CrawlerBackend {
    /// Read a previously recorded JSON capture
    Replay,
    /// Drive Chrome through chromedriver
    #[value(name = "webdriver")]
    WebDriver,
}

#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "webdriver"), allow(dead_code))]
pub struct CrawlOptions {
    pub url: String,
    pub max_pages: usize,
    pub respect_robots_txt: bool,
    pub interact_with_consent: bool,
    pub chromedriver_url: String,
    pub headless: bool,
    pub capture_path: Option<PathBuf>,
}

pub fn create_crawler(backend: CrawlerBackend, options: CrawlOptions) -> Result<Box<dyn Crawler>, CrawlError> {
    match backend {
        CrawlerBackend::Replay => {
            let path = options.capture_path.ok_or(CrawlError::MissingCapture)?;
            Ok(Box::new(ReplayCrawler::new(path)))
        }
        #[cfg(feature = "webdriver")]
        CrawlerBackend::WebDriver => Ok(Box::new(WebDriverCrawler::new(options))),
        #[cfg(not(feature = "webdriver"))]
        CrawlerBackend::WebDriver => Err(CrawlError::BackendUnavailable("webdriver")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(capture_path: Option<PathBuf>) -> CrawlOptions {
        CrawlOptions {
            url: "https://example.com".to_string(),
            max_pages: 1,
            respect_robots_txt: true,
            interact_with_consent: true,
            chromedriver_url: "http://localhost:9515".to_string(),
            headless: true,
            capture_path,
        }
    }

    #[test]
    fn test_replay_needs_capture() {
        let result = create_crawler(CrawlerBackend::Replay, options(None));
        assert!(matches!(result, Err(CrawlError::MissingCapture)));
    }

    #[test]
    fn test_crawl_output_format() {
        let raw = r#"{
            "cookies": [{"name": "a", "domain": "x.com"}],
            "storage": {"https://x.com/": {"localStorage": {"k": "v"}, "sessionStorage": {}}},
            "pre_consent": {"cookies": []}
        }"#;
        let output: CrawlOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(output.cookies.len(), 1);
        assert_eq!(output.storage["https://x.com/"].local_storage["k"], "v");
        assert_eq!(output.pre_consent.unwrap().cookies.len(), 0);
    }
}
