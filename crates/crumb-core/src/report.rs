//! Aggregate statistics over classified cookies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifiedCookies;
use crate::domain;
use crate::types::{Category, ClassificationMethod, Cookie};

/// Domain bucket for cookies without a domain.
pub const UNKNOWN_DOMAIN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieReport {
    pub total: usize,
    pub categories: BTreeMap<Category, usize>,
    pub methods: BTreeMap<ClassificationMethod, usize>,
    pub domains: BTreeMap<String, usize>,
    pub session: usize,
    pub persistent: usize,
    /// Mean remaining lifetime of persistent cookies in seconds.
    pub avg_lifetime: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party: Option<usize>,
}

impl CookieReport {
    /// Build the report. `site_host` enables the third-party count.
    pub fn build(classified: &ClassifiedCookies, reference_time: f64, site_host: Option<&str>) -> Self {
        let mut methods = BTreeMap::new();
        for cookie in classified.all() {
            *methods.entry(cookie.classification_method).or_insert(0) += 1;
        }

        let cookies: Vec<&Cookie> = classified.all().map(|c| &c.cookie).collect();
        let (session, persistent) = session_split(cookies.iter().copied());

        Self {
            total: cookies.len(),
            categories: classified.counts(),
            methods,
            domains: domain_counts(cookies.iter().copied()),
            session,
            persistent,
            avg_lifetime: average_lifetime(cookies.iter().copied(), reference_time),
            third_party: site_host.map(|host| {
                cookies
                    .iter()
                    .filter(|c| domain::is_third_party(host, &c.domain))
                    .count()
            }),
        }
    }
}

/// Cookie count per raw domain string; empty domains go to [`UNKNOWN_DOMAIN`].
pub fn domain_counts<'a>(cookies: impl IntoIterator<Item = &'a Cookie>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for cookie in cookies {
        let key = if cookie.domain.is_empty() {
            UNKNOWN_DOMAIN.to_string()
        } else {
            cookie.domain.clone()
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// `(session, persistent)` counts.
pub fn session_split<'a>(cookies: impl IntoIterator<Item = &'a Cookie>) -> (usize, usize) {
    cookies.into_iter().fold((0, 0), |(session, persistent), cookie| {
        if cookie.is_session() {
            (session + 1, persistent)
        } else {
            (session, persistent + 1)
        }
    })
}

/// Mean lifetime over persistent cookies only, `0.0` if there are none.
pub fn average_lifetime<'a>(cookies: impl IntoIterator<Item = &'a Cookie>, reference_time: f64) -> f64 {
    let (sum, count) = cookies
        .into_iter()
        .filter_map(|c| c.lifetime(reference_time))
        .fold((0.0, 0usize), |(sum, count), lifetime| (sum + lifetime, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
