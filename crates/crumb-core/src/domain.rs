//! Host and registrable-domain helpers
//!
//! Cookie domains arrive in several spellings (`.example.com`, `Example.COM`,
//! `www.example.com`). These helpers normalise them and compute a registrable
//! domain (eTLD+1) using a small two-part suffix table instead of a full PSL.
//!
//! # Examples
//!
//! ```
//! use crumb_core::domain::registrable_domain;
//!
//! assert_eq!(registrable_domain(".sub.example.com"), "example.com");
//! assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
//! ```

/// Second-level public suffixes; a registrable domain under one of these
/// keeps three labels.
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "ac.jp", "ac.uk", "co.in", "co.jp", "co.kr", "co.nz", "co.uk", "co.za",
    "com.au", "com.br", "com.cn", "com.hk", "com.mx", "com.tr", "com.tw",
    "gov.au", "gov.uk", "ne.jp", "net.au", "net.nz", "or.jp", "org.au", "org.uk",
];

/// Lowercase a cookie domain and strip the leading/trailing dots.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_matches('.').to_ascii_lowercase()
}

/// Get the registrable domain (eTLD+1) for a host or cookie domain.
///
/// Empty labels (`a..b.com`) are ignored. Hosts with two or fewer labels
/// come back normalised but otherwise unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = normalize_domain(host);
    let labels: Vec<&str> = host.rsplit('.').filter(|l| !l.is_empty()).collect();

    let keep = match labels.as_slice() {
        [tld, second, _, ..] if SECOND_LEVEL_SUFFIXES.contains(&format!("{second}.{tld}").as_str()) => 3,
        _ => 2,
    };

    let mut kept: Vec<&str> = labels.into_iter().take(keep).collect();
    kept.reverse();
    kept.join(".")
}

/// Check if two hosts share the same registrable domain.
pub fn is_same_site(host1: &str, host2: &str) -> bool {
    registrable_domain(host1) == registrable_domain(host2)
}

/// A cookie is third-party when its domain belongs to another site.
/// Cookies without a domain are never counted as third-party.
pub fn is_third_party(site_host: &str, cookie_domain: &str) -> bool {
    if cookie_domain.trim().is_empty() {
        return false;
    }
    !is_same_site(site_host, cookie_domain)
}

// =============================================================================
// URL helpers
// =============================================================================

/// Get the position after "://".
fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

/// Extract the host of an absolute URL without allocating.
pub fn extract_host(url: &str) -> Option<&str> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for i in scheme_end..bytes.len() {
        if bytes[i] == b'@' {
            host_start = i + 1;
            break;
        }
        if bytes[i] == b'/' {
            break;
        }
    }

    let mut host_end = bytes.len();
    for i in host_start..bytes.len() {
        let b = bytes[i];
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some(&url[host_start..host_end])
}

/// Add `https://` when the scheme is missing. Returns `None` if the result
/// has no host.
pub fn normalize_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match extract_host(&url) {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}
