//! Classification orchestration
//!
//! For each cookie: database lookup, then the rule table (which itself ends in
//! heuristics and the `Other` default). Every cookie ends up in exactly one of
//! the five category buckets.
//!
//! Classification never mutates its input; each [`ClassifiedCookie`] owns a
//! copy of the raw record.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::database::{CookieDatabase, DatabaseEntry};
use crate::rules::RuleTable;
use crate::types::{Category, ClassificationMethod, ClassifiedCookie, Cookie};

/// Current wall clock as fractional Unix seconds.
pub fn now_epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Generated description for cookies the database does not know.
pub fn describe(category: Category, name: &str) -> String {
    match category {
        Category::StrictlyNecessary => {
            format!("Cookie '{}' is required for the website to function.", name)
        }
        Category::Functional => {
            format!("Cookie '{}' stores preferences and enables extra features.", name)
        }
        Category::Performance => {
            format!("Cookie '{}' collects statistics about how the website is used.", name)
        }
        Category::Targeting => {
            format!("Cookie '{}' is used to track visitors for advertising.", name)
        }
        Category::Other => format!("Purpose of cookie '{}' is unknown.", name),
    }
}

// =============================================================================
// Classified Cookies
// =============================================================================

/// Category -> classified cookies. All five categories are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassifiedCookies {
    buckets: BTreeMap<Category, Vec<ClassifiedCookie>>,
}

impl ClassifiedCookies {
    pub fn new() -> Self {
        Self {
            buckets: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    pub fn push(&mut self, classified: ClassifiedCookie) {
        self.buckets.entry(classified.category).or_default().push(classified);
    }

    pub fn get(&self, category: Category) -> &[ClassifiedCookie] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of cookies per category, all five keys present.
    pub fn counts(&self) -> BTreeMap<Category, usize> {
        Category::ALL.iter().map(|c| (*c, self.get(*c).len())).collect()
    }

    /// Buckets in category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[ClassifiedCookie])> {
        self.buckets.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// All classified cookies in category order.
    pub fn all(&self) -> impl Iterator<Item = &ClassifiedCookie> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClassifiedCookies {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Classifies cookies against a database and the built-in rule table.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'db> {
    database: &'db CookieDatabase,
    rules: &'static RuleTable,
    reference_time: f64,
}

impl<'db> Classifier<'db> {
    /// Classifier using the current time as lifetime reference.
    pub fn new(database: &'db CookieDatabase) -> Self {
        Self {
            database,
            rules: RuleTable::builtin(),
            reference_time: now_epoch_seconds(),
        }
    }

    /// Fix the reference time used for lifetime heuristics.
    pub fn with_reference_time(mut self, reference_time: f64) -> Self {
        self.reference_time = reference_time;
        self
    }

    pub fn reference_time(&self) -> f64 {
        self.reference_time
    }

    pub fn database(&self) -> &'db CookieDatabase {
        self.database
    }

    /// Classify a single cookie.
    pub fn classify_one(&self, cookie: &Cookie) -> ClassifiedCookie {
        if let Some(hit) = self.database.lookup(&cookie.name) {
            log::debug!(
                "{} ({}): {} from database entry '{}'",
                cookie.name,
                cookie.domain,
                hit.category,
                hit.entry.cookie_name
            );
            let description = if hit.entry.description.is_empty() {
                describe(hit.category, &cookie.name)
            } else {
                hit.entry.description.clone()
            };
            return ClassifiedCookie {
                cookie: cookie.clone(),
                description,
                category: hit.category,
                classification_method: ClassificationMethod::Database,
            };
        }

        let rule = self.rules.classify(cookie, self.reference_time);
        log::debug!(
            "{} ({}): {} via {:?} stage",
            cookie.name,
            cookie.domain,
            rule.category,
            rule.stage
        );

        ClassifiedCookie {
            cookie: cookie.clone(),
            description: describe(rule.category, &cookie.name),
            category: rule.category,
            classification_method: rule.method(),
        }
    }

    /// Classify a batch into category buckets, preserving input order within
    /// each bucket.
    pub fn classify(&self, cookies: &[Cookie]) -> ClassifiedCookies {
        let mut result = ClassifiedCookies::new();
        for cookie in cookies {
            result.push(self.classify_one(cookie));
        }

        log::info!(
            "Classified {} cookies ({} from database)",
            result.len(),
            result
                .all()
                .filter(|c| c.classification_method == ClassificationMethod::Database)
                .count()
        );
        result
    }

    /// Per-category counts using rules and heuristics only.
    pub fn consent_categories(cookies: &[Cookie], reference_time: f64) -> BTreeMap<Category, usize> {
        let empty = CookieDatabase::empty();
        Classifier::new(&empty)
            .with_reference_time(reference_time)
            .classify(cookies)
            .counts()
    }
}

/// Classify `cookies` against a plain list of database entries.
pub fn classify(cookies: &[Cookie], database: &[DatabaseEntry]) -> ClassifiedCookies {
    let database = CookieDatabase::new(database.to_vec());
    Classifier::new(&database).classify(cookies)
}
