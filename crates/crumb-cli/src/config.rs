//! `crumb.toml` configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_DATABASE_URL: &str =
    "https://raw.githubusercontent.com/jkwakman/Open-Cookie-Database/master/open-cookie-database.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub max_pages: usize,
    pub respect_robots_txt: bool,
    pub database_path: PathBuf,
    pub database_url: String,
    pub log_level: String,
    pub chromedriver_url: String,
    pub headless: bool,
    pub interact_with_consent: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            respect_robots_txt: true,
            database_path: PathBuf::from("open-cookie-database.csv"),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_level: "info".to_string(),
            chromedriver_url: "http://localhost:9515".to_string(),
            headless: true,
            interact_with_consent: true,
        }
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CRUMB_CONFIG") {
        PathBuf::from(path)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("crumb").join("config.toml")
    } else if let Ok(appdata) = std::env::var("APPDATA") {
        PathBuf::from(appdata).join("crumb").join("config.toml")
    } else {
        PathBuf::from("crumb.toml")
    }
}

/// Load the config from `explicit` or the default path. Missing or broken
/// files fall back to defaults; the second value explains the fallback.
///
/// Nothing is logged here; the logger is not installed until the config
/// is known.
pub fn load_config(explicit: Option<&Path>) -> (AppConfig, Option<String>) {
    let path = explicit.map(Path::to_path_buf).unwrap_or_else(config_path);
    if !path.exists() {
        let warning = explicit.map(|_| format!("Config file {} not found, using defaults", path.display()));
        return (AppConfig::default(), warning);
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => (config, None),
            Err(e) => (
                AppConfig::default(),
                Some(format!("Failed to parse config at {}: {e}", path.display())),
            ),
        },
        Err(e) => (
            AppConfig::default(),
            Some(format!("Failed to read config at {}: {e}", path.display())),
        ),
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.max_pages, 5);
        assert!(config.respect_robots_txt);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config("max_pages = 12\nheadless = false\n").unwrap();
        assert_eq!(config.max_pages, 12);
        assert!(!config.headless);
        assert_eq!(config.chromedriver_url, "http://localhost:9515");
    }

    #[test]
    fn test_invalid_file_is_error() {
        assert!(parse_config("max_pages = \"many\"").is_err());
    }

    #[test]
    fn test_missing_explicit_path_uses_defaults() {
        let (config, warning) = load_config(Some(Path::new("/nonexistent/crumb.toml")));
        assert_eq!(config, AppConfig::default());
        assert!(warning.unwrap().contains("not found"));
    }

    #[test]
    fn test_unparsable_file_reports_warning() {
        let path = std::env::temp_dir().join(format!("crumb-config-{}.toml", std::process::id()));
        std::fs::write(&path, "max_pages = \"many\"").unwrap();
        let (config, warning) = load_config(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(warning.unwrap().starts_with("Failed to parse config"));
    }

    #[test]
    fn test_valid_file_has_no_warning() {
        let path = std::env::temp_dir().join(format!("crumb-config-ok-{}.toml", std::process::id()));
        std::fs::write(&path, "max_pages = 3\n").unwrap();
        let (config, warning) = load_config(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.max_pages, 3);
        assert!(warning.is_none());
    }

    #[test]
    fn test_config_path_ends_with_toml() {
        let path = config_path();
        assert!(path.extension().is_some_and(|ext| ext == "toml"));
    }
}
