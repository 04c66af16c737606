//! robots.txt handling
//!
//! Only the `User-agent: *` group is honoured, and only its `Disallow`
//! prefixes. An empty `Disallow:` allows everything.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    disallow: Vec<String>,
}

impl RobotsRules {
    /// Rules that allow every path.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut disallow = Vec::new();
        let mut in_wildcard_group = false;
        let mut group_has_rules = false;

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    // Consecutive user-agent lines share one group.
                    if group_has_rules {
                        in_wildcard_group = false;
                        group_has_rules = false;
                    }
                    if value == "*" {
                        in_wildcard_group = true;
                    }
                }
                "disallow" => {
                    group_has_rules = true;
                    if in_wildcard_group && !value.is_empty() {
                        disallow.push(value.to_string());
                    }
                }
                "allow" | "crawl-delay" => group_has_rules = true,
                _ => {}
            }
        }

        Self { disallow }
    }

    /// Check a URL path (with query) against the disallow prefixes.
    pub fn is_allowed(&self, path: &str) -> bool {
        let path = if path.is_empty() { "/" } else { path };
        !self.disallow.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Path and query of an absolute URL, `/` if there is none.
pub fn url_path(url: &str) -> &str {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match after_scheme.find(['/', '?']) {
        Some(pos) => {
            let path = &after_scheme[pos..];
            path.split('#').next().unwrap_or(path)
        }
        None => "/",
    }
}

/// Fetch `robots.txt` for `origin`. Any failure yields allow-all.
pub async fn fetch_robots(client: &reqwest::Client, origin: &str) -> RobotsRules {
    let url = format!("{}/robots.txt", origin.trim_end_matches('/'));
    let response = match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            log::debug!("No robots.txt at {} ({})", url, response.status());
            return RobotsRules::allow_all();
        }
        Err(e) => {
            log::warn!("Failed to fetch {}: {}", url, e);
            return RobotsRules::allow_all();
        }
    };

    match response.text().await {
        Ok(text) => RobotsRules::parse(&text),
        Err(e) => {
            log::warn!("Failed to read {}: {}", url, e);
            RobotsRules::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
User-agent: Googlebot
Disallow: /nogoogle

User-agent: *
Disallow: /private # comment
Disallow: /tmp/
Allow: /public

User-agent: other
Disallow: /other
";

    #[test]
    fn test_wildcard_group_only() {
        let rules = RobotsRules::parse(ROBOTS);
        assert!(!rules.is_allowed("/private/page"));
        assert!(!rules.is_allowed("/tmp/x"));
        assert!(rules.is_allowed("/nogoogle"));
        assert!(rules.is_allowed("/other"));
        assert!(rules.is_allowed("/"));
    }

    #[test]
    fn test_empty_disallow_allows_all() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n");
        assert_eq!(rules, RobotsRules::allow_all());
    }

    #[test]
    fn test_shared_group() {
        let rules = RobotsRules::parse("User-agent: a\nUser-agent: *\nDisallow: /x\n");
        assert!(!rules.is_allowed("/x"));
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("https://x.com"), "/");
        assert_eq!(url_path("https://x.com/a/b?c=1#frag"), "/a/b?c=1");
        assert_eq!(url_path("https://x.com?q"), "?q");
    }
}
