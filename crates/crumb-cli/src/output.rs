//! Analysis result and its text/JSON rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crumb_core::consent::{ChangeKind, StorageArea, ADDED_AFTER_CONSENT};
use crumb_core::fingerprint::Evidence;
use crumb_core::{
    dedupe, detect, ClassifiedCookie, ClassifiedCookies, Classifier, ConsentComparison, CookieReport,
    FingerprintReport, StorageSnapshot,
};

use crate::crawler::CrawlOutput;

#[derive(Debug, Clone, Serialize)]
pub struct FingerprintOutput {
    pub techniques: BTreeMap<&'static str, bool>,
    pub evidence: Vec<Evidence>,
}

impl From<FingerprintReport> for FingerprintOutput {
    fn from(report: FingerprintReport) -> Self {
        Self {
            techniques: report.to_map(),
            evidence: report.evidence,
        }
    }
}

/// Everything `crumb analyze` reports.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub cookies: ClassifiedCookies,
    pub storage: StorageSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<ConsentComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprinting: Option<FingerprintOutput>,
    pub report: CookieReport,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions<'a> {
    pub site_host: Option<&'a str>,
    pub fingerprinting: bool,
}

impl Analysis {
    /// Dedupe, classify and summarise a crawl.
    pub fn build(output: &CrawlOutput, classifier: &Classifier<'_>, options: AnalysisOptions<'_>) -> Self {
        let cookies = dedupe(&output.cookies);
        let classified = classifier.classify(&cookies);
        let report = CookieReport::build(&classified, classifier.reference_time(), options.site_host);

        let consent = output.pre_consent.as_ref().map(|pre| {
            ConsentComparison::build(&pre.cookies, &output.cookies, classifier)
                .with_storage(&pre.storage, &output.storage)
        });

        let fingerprinting = options
            .fingerprinting
            .then(|| detect(&cookies, &output.storage).into());

        Self {
            cookies: classified,
            storage: output.storage.clone(),
            consent,
            fingerprinting,
            report,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self, show_dynamic: bool) -> String {
        let mut out = String::new();

        out.push_str("=== Cookies by category ===\n");
        render_buckets(&mut out, &self.cookies);

        render_storage(&mut out, &self.storage, show_dynamic);

        if let Some(consent) = &self.consent {
            let _ = writeln!(out, "\n=== {} ===", ADDED_AFTER_CONSENT);
            if consent.added_after_consent.is_empty() {
                out.push_str("  (none)\n");
            } else {
                render_buckets(&mut out, &consent.added_after_consent);
            }
            for change in &consent.storage_changes {
                let area = match change.area {
                    StorageArea::LocalStorage => "localStorage",
                    StorageArea::SessionStorage => "sessionStorage",
                };
                let kind = match change.kind {
                    ChangeKind::Added => "added",
                    ChangeKind::Changed => "changed",
                };
                let _ = writeln!(out, "  {} {} {} ({})", area, kind, change.key, change.url);
            }
        }

        if let Some(fingerprinting) = &self.fingerprinting {
            out.push_str("\n=== Fingerprinting ===\n");
            for (technique, detected) in &fingerprinting.techniques {
                let _ = writeln!(out, "  {:<24} {}", technique, if *detected { "yes" } else { "no" });
            }
        }

        render_report(&mut out, &self.report);
        out
    }
}

fn render_buckets(out: &mut String, cookies: &ClassifiedCookies) {
    for (category, bucket) in cookies.iter() {
        let _ = writeln!(out, "\n{} ({})", category, bucket.len());
        for cookie in bucket {
            render_cookie(out, cookie);
        }
    }
}

fn render_cookie(out: &mut String, classified: &ClassifiedCookie) {
    let cookie = &classified.cookie;
    let expiry = if cookie.is_session() {
        "session".to_string()
    } else {
        format!("{:.0}", cookie.expires)
    };
    let _ = writeln!(out, "  - {}", cookie.name);
    let _ = writeln!(out, "      description: {}", classified.description);
    let _ = writeln!(
        out,
        "      category:    {} ({})",
        classified.category, classified.classification_method
    );
    let _ = writeln!(out, "      expires:     {}", expiry);
    let _ = writeln!(out, "      domain:      {}", cookie.domain);
}

fn render_storage(out: &mut String, storage: &StorageSnapshot, show_dynamic: bool) {
    if storage.values().all(|page| page.local_storage.is_empty() && page.session_storage.is_empty())
        && !show_dynamic
    {
        return;
    }

    out.push_str("\n=== Web storage ===\n");
    for (url, page) in storage {
        let _ = writeln!(out, "\n{}", url);
        for (key, value) in &page.local_storage {
            let _ = writeln!(out, "  localStorage   {} = {}", key, truncate(value, 60));
        }
        for (key, value) in &page.session_storage {
            let _ = writeln!(out, "  sessionStorage {} = {}", key, truncate(value, 60));
        }
        if show_dynamic {
            for cookie in &page.dynamic_cookies {
                let _ = writeln!(out, "  dynamic cookie {} = {}", cookie.name, truncate(&cookie.value, 60));
            }
        }
    }
}

fn render_report(out: &mut String, report: &CookieReport) {
    out.push_str("\n=== Summary ===\n");
    let _ = writeln!(out, "  Total:       {}", report.total);
    for (category, count) in &report.categories {
        let _ = writeln!(out, "  {:<20} {}", category.as_str(), count);
    }
    let _ = writeln!(out, "  Session:     {}", report.session);
    let _ = writeln!(out, "  Persistent:  {}", report.persistent);
    let _ = writeln!(out, "  Avg lifetime: {:.1} days", report.avg_lifetime / 86_400.0);
    if let Some(third_party) = report.third_party {
        let _ = writeln!(out, "  Third-party: {}", third_party);
    }
    let methods: Vec<String> = report
        .methods
        .iter()
        .map(|(method, count)| format!("{} {}", method, count))
        .collect();
    if !methods.is_empty() {
        let _ = writeln!(out, "  Methods:     {}", methods.join(", "));
    }
}

/// Shorten `text` to at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crumb_core::{Cookie, CookieDatabase, PageStorage};

    use crate::crawler::Capture;

    const NOW: f64 = 1_700_000_000.0;

    fn sample_output() -> CrawlOutput {
        let mut page = PageStorage::default();
        page.local_storage.insert("deviceid".into(), "abc".into());
        CrawlOutput {
            cookies: vec![
                Cookie::new("PHPSESSID", "shop.com").with_value("1"),
                Cookie::new("PHPSESSID", "shop.com").with_value("1"),
                Cookie::new("_fbp", ".facebook.com").with_expires(NOW + 3_600.0),
            ],
            storage: StorageSnapshot::from([("https://shop.com/".to_string(), page)]),
            pre_consent: Some(Capture {
                cookies: vec![Cookie::new("PHPSESSID", "shop.com").with_value("1")],
                storage: StorageSnapshot::new(),
            }),
        }
    }

    #[test]
    fn test_build_analysis() {
        let db = CookieDatabase::empty();
        let classifier = Classifier::new(&db).with_reference_time(NOW);
        let options = AnalysisOptions { site_host: Some("shop.com"), fingerprinting: true };
        let analysis = Analysis::build(&sample_output(), &classifier, options);

        assert_eq!(analysis.report.total, 2);
        assert_eq!(analysis.report.third_party, Some(1));
        let consent = analysis.consent.as_ref().unwrap();
        assert_eq!(consent.added_after_consent.len(), 1);
        assert_eq!(consent.storage_changes.len(), 1);
        assert_eq!(analysis.fingerprinting.as_ref().unwrap().techniques["persistent_identifiers"], true);
    }

    #[test]
    fn test_json_shape() {
        let db = CookieDatabase::empty();
        let classifier = Classifier::new(&db).with_reference_time(NOW);
        let analysis = Analysis::build(&sample_output(), &classifier, AnalysisOptions::default());
        let json: serde_json::Value = serde_json::from_str(&analysis.to_json().unwrap()).unwrap();

        assert!(json["cookies"]["Targeting"].is_array());
        assert!(json["consent"][ADDED_AFTER_CONSENT].is_object());
        assert!(json.get("fingerprinting").is_none());
        assert_eq!(json["report"]["total"], 2);
    }

    #[test]
    fn test_render_text() {
        let db = CookieDatabase::empty();
        let classifier = Classifier::new(&db).with_reference_time(NOW);
        let options = AnalysisOptions { site_host: None, fingerprinting: true };
        let text = Analysis::build(&sample_output(), &classifier, options).render_text(false);

        assert!(text.contains("Targeting (1)"));
        assert!(text.contains("_fbp"));
        assert!(text.contains(ADDED_AFTER_CONSENT));
        assert!(text.contains("localStorage   deviceid = abc"));
        assert!(text.contains("persistent_identifiers"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
