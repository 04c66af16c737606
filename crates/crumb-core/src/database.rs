//! Cookie database lookup
//!
//! The database is an externally supplied table (see `crumb-db` for the CSV
//! reader). [`CookieDatabase`] indexes it once so that each lookup is a hash
//! lookup plus, on a miss, a scan of the wildcard entries only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::Category;

/// One row of the cookie database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub vendor: String,
    /// Free-text category, mapped with [`map_database_category`].
    #[serde(default)]
    pub category: String,
    pub cookie_name: String,
    /// Value or domain column; informational only.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub vendor_site: String,
    #[serde(default)]
    pub privacy_policy: String,
    #[serde(default)]
    pub is_wildcard: bool,
}

impl DatabaseEntry {
    pub fn new(cookie_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn wildcard(mut self) -> Self {
        self.is_wildcard = true;
        self
    }
}

// =============================================================================
// Category Mapping
// =============================================================================

const NECESSARY_KEYWORDS: &[&str] = &["essential", "necessary", "erforderlich"];
const FUNCTIONAL_KEYWORDS: &[&str] = &["functional", "preference", "präferenz"];
const PERFORMANCE_KEYWORDS: &[&str] = &["analytic", "statistic", "performance"];
const TARGETING_KEYWORDS: &[&str] = &["targeting", "advertisement", "marketing", "werbung"];

/// Map free-text database categories onto the canonical set.
///
/// Substring match on the lowercased text, checked Necessary, Functional,
/// Performance, Targeting in that order. Anything else is `Other`.
pub fn map_database_category(text: &str) -> Category {
    let text = text.to_lowercase();
    let groups = [
        (NECESSARY_KEYWORDS, Category::StrictlyNecessary),
        (FUNCTIONAL_KEYWORDS, Category::Functional),
        (PERFORMANCE_KEYWORDS, Category::Performance),
        (TARGETING_KEYWORDS, Category::Targeting),
    ];

    groups
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

// =============================================================================
// Wildcard Patterns
// =============================================================================

/// Compiled wildcard pattern, stored lowercased.
#[derive(Debug, Clone)]
enum WildcardPattern {
    /// Flagged wildcard without `*`: plain prefix.
    Prefix(String),
    /// `*`-separated literal segments, anchored at both ends.
    Glob(Vec<String>),
}

impl WildcardPattern {
    fn new(cookie_name: &str) -> Self {
        let lower = cookie_name.to_lowercase();
        if lower.contains('*') {
            Self::Glob(lower.split('*').map(str::to_string).collect())
        } else {
            Self::Prefix(lower)
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Self::Glob(segments) => glob_match(segments, name),
        }
    }
}

/// Match `name` against `*`-split segments. The first segment must be a
/// prefix, the last a suffix, the middle ones appear in order.
fn glob_match(segments: &[String], name: &str) -> bool {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return name.is_empty(),
    };
    if !name.starts_with(first.as_str()) {
        return false;
    }
    let (last, middle) = match rest.split_last() {
        // No `*` at all
        None => return name.len() == first.len(),
        Some(split) => split,
    };

    let mut remaining = &name[first.len()..];
    for segment in middle {
        match remaining.find(segment.as_str()) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

// =============================================================================
// Cookie Database
// =============================================================================

/// A database hit together with its mapped category.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseMatch<'a> {
    pub entry: &'a DatabaseEntry,
    pub category: Category,
}

/// Indexed, read-only view of the cookie database.
#[derive(Debug, Clone, Default)]
pub struct CookieDatabase {
    entries: Vec<DatabaseEntry>,
    /// Lowercased name -> index of the first exact entry.
    exact: HashMap<String, usize>,
    /// Wildcard entries in table order.
    wildcards: Vec<(WildcardPattern, usize)>,
}

impl CookieDatabase {
    pub fn new(entries: Vec<DatabaseEntry>) -> Self {
        let mut exact = HashMap::with_capacity(entries.len());
        let mut wildcards = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            if entry.cookie_name.is_empty() {
                continue;
            }
            if entry.is_wildcard {
                wildcards.push((WildcardPattern::new(&entry.cookie_name), idx));
            } else {
                exact.entry(entry.cookie_name.to_lowercase()).or_insert(idx);
            }
        }

        log::debug!(
            "Indexed cookie database: {} exact names, {} wildcard patterns",
            exact.len(),
            wildcards.len()
        );

        Self { entries, exact, wildcards }
    }

    /// A database with no entries; classification falls back to rules.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DatabaseEntry] {
        &self.entries
    }

    /// Find the entry for a cookie name: exact (case-insensitive) first,
    /// then wildcard entries in table order.
    pub fn find(&self, cookie_name: &str) -> Option<&DatabaseEntry> {
        if cookie_name.is_empty() {
            return None;
        }
        let name = cookie_name.to_lowercase();

        if let Some(&idx) = self.exact.get(&name) {
            return Some(&self.entries[idx]);
        }

        self.wildcards
            .iter()
            .find(|(pattern, _)| pattern.matches(&name))
            .map(|(_, idx)| &self.entries[*idx])
    }

    /// Like [`find`](Self::find), but entries whose category maps to `Other`
    /// (including the literal `Unknown`) count as a miss.
    pub fn lookup(&self, cookie_name: &str) -> Option<DatabaseMatch<'_>> {
        let entry = self.find(cookie_name)?;
        match map_database_category(&entry.category) {
            Category::Other => None,
            category => Some(DatabaseMatch { entry, category }),
        }
    }
}

impl From<Vec<DatabaseEntry>> for CookieDatabase {
    fn from(entries: Vec<DatabaseEntry>) -> Self {
        Self::new(entries)
    }
}
