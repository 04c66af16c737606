//! Core type definitions for Crumb
//!
//! These types are the plain-data contract between the crawler collaborator,
//! the classification engine and the exporters. Field names on the wire follow
//! the browser drivers (`httpOnly`, `sameSite`, `localStorage`, ...).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Category
// =============================================================================

/// Consent category a cookie is sorted into.
///
/// The order of the variants is the order buckets are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Strictly Necessary", alias = "Necessary")]
    StrictlyNecessary,
    Functional,
    Performance,
    Targeting,
    #[serde(alias = "Unknown", alias = "Unbekannt")]
    Other,
}

impl Category {
    /// All categories in report order.
    pub const ALL: [Category; 5] = [
        Category::StrictlyNecessary,
        Category::Functional,
        Category::Performance,
        Category::Targeting,
        Category::Other,
    ];

    /// Display label, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrictlyNecessary => "Strictly Necessary",
            Self::Functional => "Functional",
            Self::Performance => "Performance",
            Self::Targeting => "Targeting",
            Self::Other => "Other",
        }
    }

    /// Parse a canonical label. Legacy spellings map onto the canonical set.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Strictly Necessary" | "Necessary" => Some(Self::StrictlyNecessary),
            "Functional" => Some(Self::Functional),
            "Performance" => Some(Self::Performance),
            "Targeting" => Some(Self::Targeting),
            "Other" | "Unknown" | "Unbekannt" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Classification Method
// =============================================================================

/// Which stage of the decision procedure assigned the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    /// Authoritative database entry
    Database,
    /// Domain, name or keyword rule (or the final default)
    Rule,
    /// Shape-based heuristic fallback
    Heuristic,
}

impl ClassificationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Rule => "rule",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Cookie Source
// =============================================================================

/// Capture channel a cookie record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieSource {
    /// Browser cookie jar
    #[default]
    Direct,
    /// Read from `document.cookie`
    #[serde(rename = "document.cookie")]
    DocumentCookie,
    /// `document.cookie` of an embedded frame
    Iframe,
    /// Intercepted `document.cookie` writes
    Dynamic,
    /// Embedded YouTube player
    Youtube,
    /// Shop/cart pages
    Ecommerce,
}

// =============================================================================
// Cookie
// =============================================================================

/// Expiry value used for session cookies.
pub const SESSION_EXPIRY: f64 = -1.0;

/// A raw cookie record as produced by the crawler.
///
/// Every field has a default so that malformed records (missing name or
/// domain) deserialize instead of failing; they simply classify as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix epoch seconds, `-1` for session cookies.
    #[serde(default = "session_expiry", alias = "expiry", deserialize_with = "deserialize_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    /// Explicit session flag as reported by CDP.
    #[serde(default, skip_serializing_if = "is_false")]
    pub session: bool,
    #[serde(default)]
    pub source: CookieSource,
    #[serde(rename = "added_after_consent", default, skip_serializing_if = "is_false")]
    pub added_after_consent: bool,
    #[serde(rename = "changed_after_consent", default, skip_serializing_if = "is_false")]
    pub changed_after_consent: bool,
}

impl Cookie {
    /// Create a session cookie with an empty value on path `/`.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            domain: domain.into(),
            path: default_path(),
            expires: SESSION_EXPIRY,
            secure: false,
            http_only: false,
            same_site: None,
            session: false,
            source: CookieSource::Direct,
            added_after_consent: false,
            changed_after_consent: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_expires(mut self, expires: f64) -> Self {
        self.expires = expires;
        self
    }

    pub fn with_source(mut self, source: CookieSource) -> Self {
        self.source = source;
        self
    }

    /// Deduplication key. An empty path counts as `/`.
    pub fn identity_key(&self) -> IdentityKey<'_> {
        IdentityKey {
            name: &self.name,
            domain: &self.domain,
            path: if self.path.is_empty() { "/" } else { &self.path },
        }
    }

    /// Session cookie: explicit flag, negative expiry or no usable expiry.
    pub fn is_session(&self) -> bool {
        self.session || self.expires.is_nan() || self.expires < 0.0
    }

    /// Remaining lifetime in seconds relative to `reference_time`.
    /// `None` for session cookies.
    pub fn lifetime(&self, reference_time: f64) -> Option<f64> {
        if self.is_session() {
            None
        } else {
            Some(self.expires - reference_time)
        }
    }
}

/// `(name, domain, path)` identity of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey<'a> {
    pub name: &'a str,
    pub domain: &'a str,
    pub path: &'a str,
}

impl IdentityKey<'_> {
    pub fn to_owned_key(&self) -> (String, String, String) {
        (self.name.to_string(), self.domain.to_string(), self.path.to_string())
    }
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    SESSION_EXPIRY
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Accepts numbers, numeric strings and `null` (session).
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawExpiry {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<RawExpiry>::deserialize(deserializer)? {
        Some(RawExpiry::Number(n)) => n,
        Some(RawExpiry::Text(s)) => s.trim().parse().unwrap_or(SESSION_EXPIRY),
        None => SESSION_EXPIRY,
    })
}

// =============================================================================
// Classified Cookie
// =============================================================================

/// A cookie annotated with its category and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedCookie {
    #[serde(flatten)]
    pub cookie: Cookie,
    pub description: String,
    pub category: Category,
    pub classification_method: ClassificationMethod,
}

// =============================================================================
// Web Storage
// =============================================================================

/// Storage state captured for a single page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageStorage {
    #[serde(rename = "localStorage", default)]
    pub local_storage: BTreeMap<String, String>,
    #[serde(rename = "sessionStorage", default)]
    pub session_storage: BTreeMap<String, String>,
    #[serde(rename = "dynamicCookies", default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_cookies: Vec<Cookie>,
}

impl PageStorage {
    /// Iterate over local then session storage entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local_storage
            .iter()
            .chain(self.session_storage.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.local_storage.is_empty() && self.session_storage.is_empty() && self.dynamic_cookies.is_empty()
    }
}

/// Page URL -> storage captured on that page, for one crawl phase.
pub type StorageSnapshot = BTreeMap<String, PageStorage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_label("Necessary"), Some(Category::StrictlyNecessary));
        assert_eq!(Category::from_label("Unbekannt"), Some(Category::Other));
        assert_eq!(Category::from_label("Marketing"), None);
    }

    #[test]
    fn test_cookie_defaults_for_missing_fields() {
        let cookie: Cookie = serde_json::from_str(r#"{"value": "x"}"#).unwrap();
        assert_eq!(cookie.name, "");
        assert_eq!(cookie.domain, "");
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.source, CookieSource::Direct);
        assert!(cookie.is_session());
    }

    #[test]
    fn test_cookie_wire_names() {
        let raw = r#"{
            "name": "sid", "value": "1", "domain": ".example.com", "path": "/",
            "expires": 1700000000.5, "httpOnly": true, "secure": true,
            "sameSite": "Lax", "source": "document.cookie"
        }"#;
        let cookie: Cookie = serde_json::from_str(raw).unwrap();
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
        assert_eq!(cookie.source, CookieSource::DocumentCookie);
        assert!(!cookie.is_session());

        let json = serde_json::to_value(&cookie).unwrap();
        assert_eq!(json["httpOnly"], true);
        assert!(json.get("added_after_consent").is_none());
    }

    #[test]
    fn test_expiry_variants() {
        let null: Cookie = serde_json::from_str(r#"{"name": "a", "expires": null}"#).unwrap();
        assert!(null.is_session());

        let selenium: Cookie = serde_json::from_str(r#"{"name": "a", "expiry": 1700000000}"#).unwrap();
        assert_eq!(selenium.expires, 1_700_000_000.0);

        let text: Cookie = serde_json::from_str(r#"{"name": "a", "expires": "1700000000"}"#).unwrap();
        assert_eq!(text.expires, 1_700_000_000.0);
    }

    #[test]
    fn test_identity_key_defaults_path() {
        let cookie = Cookie::new("a", "x.com").with_path("");
        assert_eq!(cookie.identity_key().path, "/");
        assert_eq!(cookie.identity_key(), Cookie::new("a", "x.com").identity_key());
    }

    #[test]
    fn test_lifetime() {
        let cookie = Cookie::new("a", "x.com").with_expires(1_000.0);
        assert_eq!(cookie.lifetime(400.0), Some(600.0));
        assert_eq!(Cookie::new("a", "x.com").lifetime(400.0), None);
    }

    #[test]
    fn test_page_storage_shape() {
        let raw = r#"{"localStorage": {"k": "v"}, "sessionStorage": {"s": "t"}}"#;
        let storage: PageStorage = serde_json::from_str(raw).unwrap();
        let entries: Vec<_> = storage.entries().collect();
        assert_eq!(entries, vec![("k", "v"), ("s", "t")]);
        assert!(storage.dynamic_cookies.is_empty());
    }
}
