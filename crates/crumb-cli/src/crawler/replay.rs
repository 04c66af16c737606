use std::fs;
use std::path::PathBuf;

use super::{CrawlError, CrawlOutput, Crawler};

/// Replays a recorded JSON capture (`{cookies, storage, pre_consent?}`).
pub struct ReplayCrawler {
    path: PathBuf,
}

impl ReplayCrawler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Crawler for ReplayCrawler {
    fn crawl(&mut self) -> Result<CrawlOutput, CrawlError> {
        let content = fs::read_to_string(&self.path).map_err(|source| CrawlError::Io {
            path: self.path.clone(),
            source,
        })?;
        let output: CrawlOutput = serde_json::from_str(&content).map_err(|source| CrawlError::Capture {
            path: self.path.clone(),
            source,
        })?;

        log::info!(
            "Replayed {} cookies and {} pages of storage from {}",
            output.cookies.len(),
            output.storage.len(),
            self.path.display()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_capture() {
        let path = std::env::temp_dir().join(format!("crumb-replay-{}.json", std::process::id()));
        fs::write(&path, r#"{"cookies": [{"name": "_ga", "domain": ".x.com", "expires": 2000000000}]}"#).unwrap();

        let output = ReplayCrawler::new(&path).crawl().unwrap();
        assert_eq!(output.cookies[0].name, "_ga");
        assert!(output.storage.is_empty());
        assert!(output.pre_consent.is_none());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_replay_invalid_json() {
        let path = std::env::temp_dir().join(format!("crumb-replay-bad-{}.json", std::process::id()));
        fs::write(&path, "not json").unwrap();
        assert!(matches!(ReplayCrawler::new(&path).crawl(), Err(CrawlError::Capture { .. })));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_replay_missing_file() {
        let result = ReplayCrawler::new("/nonexistent/capture.json").crawl();
        assert!(matches!(result, Err(CrawlError::Io { .. })));
    }
}
