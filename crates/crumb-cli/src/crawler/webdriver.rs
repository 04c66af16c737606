//! Chrome crawler over chromedriver
//!
//! Breadth-first, same-site, sequential. The start page is captured once
//! before the consent banner is touched and once after; every other page is
//! captured after consent. Cookies come from CDP `Network.getAllCookies`
//! (including httpOnly and third-party cookies) plus `document.cookie`.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use serde_json::Value;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

use crumb_core::domain::{extract_host, is_same_site};
use crumb_core::{Cookie, CookieSource, PageStorage, StorageSnapshot};

use super::consent::ConsentSelectors;
use super::{Capture, CrawlError, CrawlOptions, CrawlOutput, Crawler};
use crate::robots::{fetch_robots, url_path, RobotsRules};

const PAGE_SETTLE: Duration = Duration::from_secs(2);
const CONSENT_SETTLE: Duration = Duration::from_secs(2);

const USER_AGENT: &str = concat!("crumb/", env!("CARGO_PKG_VERSION"));

/// Records `document.cookie` writes made after the hook is installed.
const DYNAMIC_COOKIE_HOOK: &str = r#"
if (!window.__crumbDynamicCookies) {
  window.__crumbDynamicCookies = [];
  const desc = Object.getOwnPropertyDescriptor(Document.prototype, 'cookie');
  if (desc && desc.configurable) {
    Object.defineProperty(document, 'cookie', {
      get() { return desc.get.call(document); },
      set(v) { window.__crumbDynamicCookies.push(String(v)); desc.set.call(document, v); },
      configurable: true
    });
  }
}
return true;
"#;

const COLLECT_PAGE_SCRIPT: &str = r#"
const dump = s => {
  const out = {};
  try { for (let i = 0; i < s.length; i++) { const k = s.key(i); out[k] = String(s.getItem(k)); } } catch (e) {}
  return out;
};
return {
  localStorage: dump(window.localStorage),
  sessionStorage: dump(window.sessionStorage),
  documentCookie: document.cookie || "",
  dynamicCookies: window.__crumbDynamicCookies || []
};
"#;

const LINKS_SCRIPT: &str = "return Array.from(document.querySelectorAll('a[href]')).map(a => a.href);";

/// Extensions that are never crawled as pages.
const SKIPPED_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".zip", ".mp4", ".css", ".js"];

pub struct WebDriverCrawler {
    options: CrawlOptions,
    selectors: ConsentSelectors,
}

impl WebDriverCrawler {
    pub fn new(options: CrawlOptions) -> Self {
        Self {
            options,
            selectors: ConsentSelectors::builtin(),
        }
    }

    async fn crawl_async(&self) -> Result<CrawlOutput, CrawlError> {
        let mut caps = ChromeCapabilities::new();
        let mut args = vec!["--no-first-run", "--no-default-browser-check", "--disable-default-apps"];
        if self.options.headless {
            args.extend(["--headless=new", "--disable-gpu"]);
        }
        for arg in args {
            caps.add_arg(arg)
                .map_err(|e| CrawlError::Driver(format!("Failed to set chrome arg: {}", e)))?;
        }

        let driver = WebDriver::new(&self.options.chromedriver_url, caps)
            .await
            .map_err(|e| CrawlError::Driver(format!("Failed to connect to chromedriver: {}", e)))?;

        let result = self.run(&driver).await;
        driver.quit().await.ok();
        result
    }

    async fn run(&self, driver: &WebDriver) -> Result<CrawlOutput, CrawlError> {
        let start_host = extract_host(&self.options.url)
            .ok_or_else(|| CrawlError::Driver(format!("Invalid start URL: {}", self.options.url)))?
            .to_string();

        let robots = if self.options.respect_robots_txt {
            let client = reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| CrawlError::Driver(format!("Failed to build HTTP client: {}", e)))?;
            fetch_robots(&client, &origin_of(&self.options.url)).await
        } else {
            RobotsRules::allow_all()
        };

        let cdp = ChromeDevTools::new(driver.handle.clone());
        let mut output = CrawlOutput::default();
        let mut queue = VecDeque::from([self.options.url.clone()]);
        let mut seen: HashSet<String> = HashSet::from([self.options.url.clone()]);
        let mut visited = 0usize;

        while let Some(url) = queue.pop_front() {
            if visited >= self.options.max_pages {
                break;
            }
            if !robots.is_allowed(url_path(&url)) {
                log::info!("Skipping {} (disallowed by robots.txt)", url);
                continue;
            }

            log::info!("Visiting {}", url);
            if let Err(e) = driver.goto(&url).await {
                log::warn!("Failed to load {}: {}", url, e);
                continue;
            }
            visited += 1;
            tokio::time::sleep(PAGE_SETTLE).await;
            install_dynamic_hook(driver).await;

            if output.pre_consent.is_none() {
                let pre = self.capture_page(driver, &cdp, &url, &start_host).await;
                output.pre_consent = Some(pre);
                if self.options.interact_with_consent {
                    self.interact_with_consent(driver).await;
                }
            }

            let capture = self.capture_page(driver, &cdp, &url, &start_host).await;
            output.cookies.extend(capture.cookies);
            output.storage.extend(capture.storage);

            for link in collect_links(driver, &start_host).await {
                if seen.insert(link.clone()) {
                    queue.push_back(link);
                }
            }
        }

        log::info!("Crawled {} pages, {} raw cookies", visited, output.cookies.len());
        Ok(output)
    }

    async fn interact_with_consent(&self, driver: &WebDriver) {
        let banner = match driver.execute(self.selectors.detect_script(), Vec::<Value>::new()).await {
            Ok(ret) => ret.json().as_bool().unwrap_or(false),
            Err(e) => {
                log::warn!("Consent banner detection failed: {}", e);
                false
            }
        };
        if !banner {
            log::info!("No consent banner detected");
            return;
        }

        match driver.execute(self.selectors.interact_script(), Vec::<Value>::new()).await {
            Ok(ret) => match ret.json().as_str() {
                Some(action) => log::info!("Consent banner handled via {}", action),
                None => log::info!("Consent banner found but no reject control matched"),
            },
            Err(e) => log::warn!("Consent interaction failed: {}", e),
        }
        tokio::time::sleep(CONSENT_SETTLE).await;
    }

    async fn capture_page(&self, driver: &WebDriver, cdp: &ChromeDevTools, url: &str, host: &str) -> Capture {
        let mut cookies = match cdp.execute_cdp("Network.getAllCookies").await {
            Ok(value) => parse_cdp_cookies(&value),
            Err(e) => {
                log::warn!("CDP cookie query failed on {}: {}", url, e);
                Vec::new()
            }
        };

        let page = match driver.execute(COLLECT_PAGE_SCRIPT, Vec::<Value>::new()).await {
            Ok(ret) => ret.json().clone(),
            Err(e) => {
                log::warn!("Storage capture failed on {}: {}", url, e);
                Value::Null
            }
        };

        let document_cookie = page.get("documentCookie").and_then(Value::as_str).unwrap_or("");
        cookies.extend(parse_cookie_string(document_cookie, host, CookieSource::DocumentCookie));

        let storage = page_storage(&page, host);
        Capture {
            cookies,
            storage: StorageSnapshot::from([(url.to_string(), storage)]),
        }
    }
}

impl Crawler for WebDriverCrawler {
    fn crawl(&mut self) -> Result<CrawlOutput, CrawlError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| CrawlError::Driver(format!("Failed to start tokio runtime: {}", e)))?;
        runtime.block_on(self.crawl_async())
    }
}

async fn install_dynamic_hook(driver: &WebDriver) {
    if let Err(e) = driver.execute(DYNAMIC_COOKIE_HOOK, Vec::<Value>::new()).await {
        log::debug!("Dynamic cookie hook not installed: {}", e);
    }
}

async fn collect_links(driver: &WebDriver, start_host: &str) -> Vec<String> {
    let ret = match driver.execute(LINKS_SCRIPT, Vec::<Value>::new()).await {
        Ok(ret) => ret,
        Err(e) => {
            log::debug!("Link extraction failed: {}", e);
            return Vec::new();
        }
    };

    ret.json()
        .as_array()
        .map(|links| {
            links
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|link| crawlable_link(link, start_host))
                .collect()
        })
        .unwrap_or_default()
}

/// Same-site http(s) page links without fragment.
fn crawlable_link(link: &str, start_host: &str) -> Option<String> {
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return None;
    }
    let link = link.split('#').next().unwrap_or(link);
    let host = extract_host(link)?;
    if !is_same_site(host, start_host) {
        return None;
    }
    let path = url_path(link).split('?').next().unwrap_or("").to_ascii_lowercase();
    if SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }
    Some(link.to_string())
}

fn origin_of(url: &str) -> String {
    match (url.split_once("://"), extract_host(url)) {
        (Some((scheme, _)), Some(host)) => format!("{}://{}", scheme, host),
        _ => url.to_string(),
    }
}

fn parse_cdp_cookies(value: &Value) -> Vec<Cookie> {
    let Some(raw) = value.get("cookies").and_then(Value::as_array) else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|c| match serde_json::from_value::<Cookie>(c.clone()) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                log::debug!("Skipping malformed CDP cookie: {}", e);
                None
            }
        })
        .collect()
}

/// Parse `name=value; name2=value2` as seen by page scripts.
fn parse_cookie_string(text: &str, host: &str, source: CookieSource) -> Vec<Cookie> {
    text.split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some(Cookie::new(name.trim(), host).with_value(value.trim()).with_source(source))
        })
        .collect()
}

fn page_storage(page: &Value, host: &str) -> PageStorage {
    let area = |key: &str| -> BTreeMap<String, String> {
        page.get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    };

    let mut storage = PageStorage {
        local_storage: area("localStorage"),
        session_storage: area("sessionStorage"),
        ..PageStorage::default()
    };
    storage.dynamic_cookies = page
        .get("dynamicCookies")
        .and_then(Value::as_array)
        .map(|writes| {
            writes
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|write| {
                    // Only the leading name=value pair; attributes follow.
                    let first = write.split(';').next()?;
                    parse_cookie_string(first, host, CookieSource::Dynamic).into_iter().next()
                })
                .collect()
        })
        .unwrap_or_default();
    storage
}
