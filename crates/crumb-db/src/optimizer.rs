use std::collections::HashSet;

use crumb_core::DatabaseEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
    pub empty_names: usize,
}

/// Drop rows without a cookie name and duplicate `(name, wildcard)` rows.
/// Names compare case-insensitively; the first row wins.
pub fn optimize_entries(entries: &mut Vec<DatabaseEntry>) -> OptimizeStats {
    let before = entries.len();

    let mut empty_names = 0usize;
    entries.retain(|entry| {
        if entry.cookie_name.trim().is_empty() {
            empty_names += 1;
            false
        } else {
            true
        }
    });

    let mut seen: HashSet<EntryKey> = HashSet::new();
    let mut deduped = 0usize;
    entries.retain(|entry| {
        if seen.insert(EntryKey::from(entry)) {
            true
        } else {
            deduped += 1;
            false
        }
    });

    OptimizeStats {
        before,
        after: entries.len(),
        deduped,
        empty_names,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    name: String,
    is_wildcard: bool,
}

impl From<&DatabaseEntry> for EntryKey {
    fn from(entry: &DatabaseEntry) -> Self {
        Self {
            name: entry.cookie_name.trim().to_lowercase(),
            is_wildcard: entry.is_wildcard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimize_entries() {
        let mut entries = vec![
            DatabaseEntry::new("_ga", "Analytics").with_description("first"),
            DatabaseEntry::new("", "Analytics"),
            DatabaseEntry::new("_GA", "Marketing"),
            DatabaseEntry::new("_ga", "Analytics").wildcard(),
        ];
        let stats = optimize_entries(&mut entries);

        assert_eq!(stats, OptimizeStats { before: 4, after: 2, deduped: 1, empty_names: 1 });
        assert_eq!(entries[0].description, "first");
        assert!(entries[1].is_wildcard);
    }
}
