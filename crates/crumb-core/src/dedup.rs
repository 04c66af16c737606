//! Cookie deduplication
//!
//! Raw captures contain the same logical cookie several times (cookie jar,
//! `document.cookie`, frames). Records are collapsed by identity key
//! `(name, domain, path)`; the first occurrence wins and capture order is kept.

use std::collections::HashSet;

use crate::types::Cookie;

/// Collapse `cookies` to one record per identity key, first seen wins.
pub fn dedupe(cookies: &[Cookie]) -> Vec<Cookie> {
    let mut seen = HashSet::with_capacity(cookies.len());
    let mut unique = Vec::with_capacity(cookies.len());

    for cookie in cookies {
        if seen.insert(cookie.identity_key()) {
            unique.push(cookie.clone());
        }
    }

    if unique.len() < cookies.len() {
        log::debug!("Deduplicated {} cookies to {}", cookies.len(), unique.len());
    }
    unique
}

/// Merge independently captured batches (per page, per phase) into one
/// deduplicated list. Earlier batches take precedence.
pub fn merge<'a, I>(batches: I) -> Vec<Cookie>
where
    I: IntoIterator<Item = &'a [Cookie]>,
{
    let all: Vec<Cookie> = batches.into_iter().flatten().cloned().collect();
    dedupe(&all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, domain: &str, path: &str, value: &str) -> Cookie {
        Cookie::new(name, domain).with_path(path).with_value(value)
    }

    #[test]
    fn test_empty() {
        assert!(dedupe(&[]).is_empty());
    }

    #[test]
    fn test_first_seen_wins_in_order() {
        let input = vec![
            cookie("b", "x.com", "/", "1"),
            cookie("a", "x.com", "/", "1"),
            cookie("b", "x.com", "/", "2"),
            cookie("b", "x.com", "/other", "3"),
            cookie("b", "y.com", "/", "4"),
        ];
        let out = dedupe(&input);
        let values: Vec<_> = out.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["1", "1", "3", "4"]);
        assert_eq!(out[0].name, "b");
    }

    #[test]
    fn test_empty_path_equals_root() {
        let input = vec![cookie("a", "x.com", "", "1"), cookie("a", "x.com", "/", "2")];
        assert_eq!(dedupe(&input).len(), 1);
    }

    #[test]
    fn test_merge_batches() {
        let page1 = vec![cookie("a", "x.com", "/", "1")];
        let page2 = vec![cookie("a", "x.com", "/", "2"), cookie("c", "x.com", "/", "3")];
        let merged = merge([page1.as_slice(), page2.as_slice()]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, "1");
    }
}
