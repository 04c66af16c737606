//! Pre/post consent comparison
//!
//! The crawler captures the start page twice: before and after interacting
//! with the consent banner. Cookies that appear or change value in between
//! were set in response to the interaction.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifiedCookies, Classifier};
use crate::dedup::dedupe;
use crate::types::{Cookie, StorageSnapshot};

/// Label of the bucket holding the diff in reports.
pub const ADDED_AFTER_CONSENT: &str = "Added after consent";

/// Return the subset of `post` that is new or changed relative to `pre`,
/// tagged accordingly. Order follows `post`.
pub fn diff(pre: &[Cookie], post: &[Cookie]) -> Vec<Cookie> {
    let mut before: HashMap<_, &str> = HashMap::with_capacity(pre.len());
    for cookie in pre {
        before.entry(cookie.identity_key()).or_insert(cookie.value.as_str());
    }

    post.iter()
        .filter_map(|cookie| match before.get(&cookie.identity_key()) {
            None => {
                let mut added = cookie.clone();
                added.added_after_consent = true;
                Some(added)
            }
            Some(&value) if value != cookie.value => {
                let mut changed = cookie.clone();
                changed.changed_after_consent = true;
                Some(changed)
            }
            Some(_) => None,
        })
        .collect()
}

// =============================================================================
// Consent Comparison
// =============================================================================

/// Full comparison of the two capture phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentComparison {
    pub pre_consent: ClassifiedCookies,
    pub post_consent: ClassifiedCookies,
    #[serde(rename = "Added after consent")]
    pub added_after_consent: ClassifiedCookies,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_changes: Vec<StorageChange>,
}

impl ConsentComparison {
    /// Dedupe both phases, diff them and classify each side and the diff.
    pub fn build(pre: &[Cookie], post: &[Cookie], classifier: &Classifier<'_>) -> Self {
        let pre = dedupe(pre);
        let post = dedupe(post);
        let changed = diff(&pre, &post);

        log::info!(
            "Consent comparison: {} cookies before, {} after, {} new or changed",
            pre.len(),
            post.len(),
            changed.len()
        );

        Self {
            pre_consent: classifier.classify(&pre),
            post_consent: classifier.classify(&post),
            added_after_consent: classifier.classify(&changed),
            storage_changes: Vec::new(),
        }
    }

    pub fn with_storage(mut self, pre: &StorageSnapshot, post: &StorageSnapshot) -> Self {
        self.storage_changes = diff_storage(pre, post);
        self
    }
}

// =============================================================================
// Storage Diff
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageArea {
    LocalStorage,
    SessionStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
}

/// A storage key that appeared or changed value after consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChange {
    pub url: String,
    pub area: StorageArea,
    pub key: String,
    pub value: String,
    pub kind: ChangeKind,
}

/// Compare two storage snapshots per URL. URLs only present in `post` count
/// as entirely added.
pub fn diff_storage(pre: &StorageSnapshot, post: &StorageSnapshot) -> Vec<StorageChange> {
    let empty = BTreeMap::new();
    let mut changes = Vec::new();

    for (url, after) in post {
        let before = pre.get(url);
        let areas = [
            (
                StorageArea::LocalStorage,
                before.map(|s| &s.local_storage).unwrap_or(&empty),
                &after.local_storage,
            ),
            (
                StorageArea::SessionStorage,
                before.map(|s| &s.session_storage).unwrap_or(&empty),
                &after.session_storage,
            ),
        ];

        for (area, old, new) in areas {
            for (key, value) in new {
                let kind = match old.get(key) {
                    None => ChangeKind::Added,
                    Some(old_value) if old_value != value => ChangeKind::Changed,
                    Some(_) => continue,
                };
                changes.push(StorageChange {
                    url: url.clone(),
                    area,
                    key: key.clone(),
                    value: value.clone(),
                    kind,
                });
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::CookieDatabase;
    use crate::types::{Category, PageStorage};

    fn cookie(name: &str, value: &str) -> Cookie {
        Cookie::new(name, "x.com").with_value(value)
    }

    #[test]
    fn test_added_cookie() {
        let pre = vec![cookie("a", "1")];
        let post = vec![cookie("a", "1"), cookie("b", "2")];
        let result = diff(&pre, &post);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "b");
        assert!(result[0].added_after_consent);
        assert!(!result[0].changed_after_consent);
    }

    #[test]
    fn test_changed_cookie() {
        let pre = vec![cookie("a", "1")];
        let post = vec![cookie("a", "2")];
        let result = diff(&pre, &post);
        assert_eq!(result.len(), 1);
        assert!(result[0].changed_after_consent);
        assert!(!result[0].added_after_consent);
    }

    #[test]
    fn test_order_and_inputs_preserved() {
        let pre = vec![cookie("a", "1")];
        let post = vec![cookie("z", "1"), cookie("a", "1"), cookie("m", "1")];
        let result = diff(&pre, &post);
        let names: Vec<_> = result.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["z", "m"]);
        assert!(!post[0].added_after_consent);
    }

    #[test]
    fn test_empty_pre_marks_everything_added() {
        let post = vec![cookie("a", "1"), cookie("b", "1")];
        assert!(diff(&[], &post).iter().all(|c| c.added_after_consent));
        assert!(diff(&post, &[]).is_empty());
    }

    #[test]
    fn test_comparison_buckets() {
        let db = CookieDatabase::empty();
        let classifier = Classifier::new(&db).with_reference_time(1_700_000_000.0);
        let pre = vec![cookie("PHPSESSID", "1")];
        let post = vec![
            cookie("PHPSESSID", "1"),
            cookie("PHPSESSID", "1"),
            Cookie::new("_fbp", "x.com").with_expires(1_700_000_100.0),
        ];
        let comparison = ConsentComparison::build(&pre, &post, &classifier);
        assert_eq!(comparison.post_consent.len(), 2);
        assert_eq!(comparison.added_after_consent.len(), 1);
        assert_eq!(comparison.added_after_consent.get(Category::Targeting).len(), 1);

        let json = serde_json::to_value(&comparison).unwrap();
        assert!(json.get(ADDED_AFTER_CONSENT).is_some());
    }

    #[test]
    fn test_diff_storage() {
        let mut before = PageStorage::default();
        before.local_storage.insert("same".into(), "1".into());
        before.local_storage.insert("changed".into(), "1".into());
        let mut after = before.clone();
        after.local_storage.insert("changed".into(), "2".into());
        after.session_storage.insert("new".into(), "x".into());

        let pre = StorageSnapshot::from([("https://x.com/".to_string(), before)]);
        let post = StorageSnapshot::from([
            ("https://x.com/".to_string(), after),
            ("https://x.com/b".to_string(), PageStorage {
                local_storage: BTreeMap::from([("k".to_string(), "v".to_string())]),
                ..PageStorage::default()
            }),
        ]);

        let changes = diff_storage(&pre, &post);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].key, "changed");
        assert_eq!(changes[0].kind, ChangeKind::Changed);
        assert_eq!(changes[1].area, StorageArea::SessionStorage);
        assert_eq!(changes[1].kind, ChangeKind::Added);
        assert_eq!(changes[2].url, "https://x.com/b");
    }
}
