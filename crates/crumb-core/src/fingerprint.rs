//! Fingerprinting evidence scan
//!
//! A pure scan over cookies and web storage for naming and value patterns
//! that suggest device fingerprinting. Evidence only ever adds techniques;
//! nothing found later can clear a flag.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{Cookie, StorageSnapshot};

bitflags::bitflags! {
    /// Detected fingerprinting techniques.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FingerprintTechniques: u8 {
        const CANVAS = 1 << 0;
        const FONT = 1 << 1;
        const WEBRTC = 1 << 2;
        const AUDIO = 1 << 3;
        const BATTERY = 1 << 4;
        /// Long-lived device or visitor identifiers
        const PERSISTENT_IDENTIFIERS = 1 << 5;
    }
}

impl Default for FingerprintTechniques {
    fn default() -> Self {
        Self::empty()
    }
}

impl FingerprintTechniques {
    /// Report key for a single technique flag.
    pub fn key(self) -> Option<&'static str> {
        TECHNIQUE_KEYS.iter().find(|(flag, _)| *flag == self).map(|(_, key)| *key)
    }
}

/// Technique flag -> report key, in report order.
pub const TECHNIQUE_KEYS: [(FingerprintTechniques, &str); 6] = [
    (FingerprintTechniques::CANVAS, "canvas_fingerprinting"),
    (FingerprintTechniques::FONT, "font_fingerprinting"),
    (FingerprintTechniques::WEBRTC, "webrtc_fingerprinting"),
    (FingerprintTechniques::AUDIO, "audio_fingerprinting"),
    (FingerprintTechniques::BATTERY, "battery_fingerprinting"),
    (FingerprintTechniques::PERSISTENT_IDENTIFIERS, "persistent_identifiers"),
];

// =============================================================================
// Patterns
// =============================================================================

/// Cookie names that look like device or visitor identifiers.
static IDENTIFIER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(fingerprint|visitorid|deviceid|uniqueid|canvas|(^|_)fp2?($|_)|^[uvmds]_?id$)")
        .expect("identifier name regex")
});

/// Opaque base64-like values.
static BASE64_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]{50,}={0,2}$").expect("base64 regex"));

/// Minimum value length for the base64 check.
const MIN_OPAQUE_VALUE_LEN: usize = 50;

/// Canvas data URLs are large; shorter values are just identifiers.
const MIN_CANVAS_VALUE_LEN: usize = 500;

const STORAGE_IDENTIFIER_KEYS: &[&str] = &[
    "canvas", "fingerprint", "deviceid", "browserhash", "clientid", "uniqueid", "deviceprint", "fp2",
];

/// Storage keys naming WebRTC peer setup: `webrtc`, `iceServers`, `stun_server`.
static WEBRTC_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(webrtc|rtcfingerprint|iceserver|icecandidate|stunserver|turnserver|(^|[^a-z])(stuns?|turns?|ice)([^a-z]|$))")
        .expect("webrtc key regex")
});

/// STUN/TURN server addresses and ICE candidate lines.
static WEBRTC_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(stuns?[:.]|turns?:|candidate:|ice-ufrag)").expect("webrtc value regex")
});

// =============================================================================
// Report
// =============================================================================

/// Where a piece of evidence was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EvidenceSource {
    Cookie { name: String, domain: String },
    Storage { url: String, key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub technique: String,
    #[serde(flatten)]
    pub source: EvidenceSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintReport {
    pub techniques: FingerprintTechniques,
    pub evidence: Vec<Evidence>,
}

impl FingerprintReport {
    fn record(&mut self, technique: FingerprintTechniques, source: &EvidenceSource) {
        self.techniques |= technique;
        if let Some(key) = technique.key() {
            self.evidence.push(Evidence { technique: key.to_string(), source: source.clone() });
        }
    }

    pub fn detected(&self, technique: FingerprintTechniques) -> bool {
        self.techniques.contains(technique)
    }

    /// Technique key -> detected flag, all six keys present.
    pub fn to_map(&self) -> BTreeMap<&'static str, bool> {
        TECHNIQUE_KEYS
            .iter()
            .map(|(flag, key)| (*key, self.techniques.contains(*flag)))
            .collect()
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Scan cookies and storage for fingerprinting evidence.
///
/// Cookies captured as `dynamicCookies` inside the storage snapshot are
/// scanned with the same rules as `cookies`.
pub fn detect(cookies: &[Cookie], storage: &StorageSnapshot) -> FingerprintReport {
    let mut report = FingerprintReport::default();

    let dynamic = storage.values().flat_map(|page| page.dynamic_cookies.iter());
    for cookie in cookies.iter().chain(dynamic) {
        scan_cookie(&mut report, cookie);
    }

    for (url, page) in storage {
        for (key, value) in page.entries() {
            scan_storage_entry(&mut report, url, key, value);
        }
    }

    if !report.techniques.is_empty() {
        log::info!(
            "Fingerprinting indicators: {:?} ({} evidence items)",
            report.techniques,
            report.evidence.len()
        );
    }
    report
}

fn scan_cookie(report: &mut FingerprintReport, cookie: &Cookie) {
    let source = EvidenceSource::Cookie {
        name: cookie.name.clone(),
        domain: cookie.domain.clone(),
    };

    if IDENTIFIER_NAME.is_match(&cookie.name) {
        report.record(FingerprintTechniques::PERSISTENT_IDENTIFIERS, &source);
    }

    if cookie.value.len() > MIN_OPAQUE_VALUE_LEN && BASE64_VALUE.is_match(&cookie.value) {
        report.record(FingerprintTechniques::PERSISTENT_IDENTIFIERS, &source);
    }
}

fn scan_storage_entry(report: &mut FingerprintReport, url: &str, key: &str, value: &str) {
    let key = key.to_lowercase();
    let value_lower = value.to_lowercase();
    let source = EvidenceSource::Storage { url: url.to_string(), key: key.clone() };

    if STORAGE_IDENTIFIER_KEYS.iter().any(|p| key.contains(p)) {
        report.record(FingerprintTechniques::PERSISTENT_IDENTIFIERS, &source);
    }

    if key.contains("canvas")
        && (value.len() > MIN_CANVAS_VALUE_LEN
            || value_lower.contains("data:image")
            || key.contains("canvasfingerprint"))
    {
        report.record(FingerprintTechniques::CANVAS, &source);
    }

    let font_key = key.contains("font") && (key.contains("fingerprint") || key.contains("detection"));
    let font_list = value_lower.contains("arial") && value_lower.contains("helvetica");
    if font_key || font_list {
        report.record(FingerprintTechniques::FONT, &source);
    }

    if WEBRTC_KEY.is_match(&key) || WEBRTC_VALUE.is_match(value) {
        report.record(FingerprintTechniques::WEBRTC, &source);
    }

    if key.contains("audio") || key.contains("oscillator") || value_lower.contains("oscillator") {
        report.record(FingerprintTechniques::AUDIO, &source);
    }

    if key.contains("battery") || key.contains("power") {
        report.record(FingerprintTechniques::BATTERY, &source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageStorage;

    fn storage(url: &str, entries: &[(&str, &str)]) -> StorageSnapshot {
        let mut page = PageStorage::default();
        for (k, v) in entries {
            page.local_storage.insert(k.to_string(), v.to_string());
        }
        StorageSnapshot::from([(url.to_string(), page)])
    }

    #[test]
    fn test_nothing_found() {
        let cookies = vec![Cookie::new("lang", "x.com").with_value("de")];
        let report = detect(&cookies, &StorageSnapshot::new());
        assert!(report.techniques.is_empty());
        assert_eq!(report.to_map().len(), 6);
        assert!(report.to_map().values().all(|v| !v));
    }

    #[test]
    fn test_identifier_cookie_names() {
        for name in ["visitorId", "device_fingerprint", "fp2", "_fp", "uid", "v_id"] {
            let report = detect(&[Cookie::new(name, "x.com")], &StorageSnapshot::new());
            assert!(report.detected(FingerprintTechniques::PERSISTENT_IDENTIFIERS), "{}", name);
        }
        for name in ["_fbp", "fpsettings", "valid", "squid"] {
            let report = detect(&[Cookie::new(name, "x.com")], &StorageSnapshot::new());
            assert!(report.techniques.is_empty(), "{}", name);
        }
    }

    #[test]
    fn test_base64_value() {
        let value = "QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVphYmNkZWZnaGlqa2xtbm9wcXJzdHV2d3h5eg==";
        let report = detect(&[Cookie::new("blob", "x.com").with_value(value)], &StorageSnapshot::new());
        assert!(report.detected(FingerprintTechniques::PERSISTENT_IDENTIFIERS));
        assert_eq!(report.evidence.len(), 1);
    }

    #[test]
    fn test_storage_techniques() {
        let snapshot = storage(
            "https://x.com/",
            &[
                ("canvas_hash", "data:image/png;base64,AAAA"),
                ("font_detection", "1"),
                ("peer", "candidate:1 1 udp 2122260223"),
                ("audioCtx", "123"),
                ("batteryLevel", "0.5"),
            ],
        );
        let report = detect(&[], &snapshot);
        assert_eq!(report.techniques, FingerprintTechniques::all());
    }

    #[test]
    fn test_short_canvas_value_is_identifier_only() {
        let report = detect(&[], &storage("https://x.com/", &[("canvas_id", "abc")]));
        assert_eq!(report.techniques, FingerprintTechniques::PERSISTENT_IDENTIFIERS);
    }

    #[test]
    fn test_plain_ice_substring_is_not_webrtc() {
        let report = detect(&[], &storage("https://x.com/", &[("price", "nice"), ("notice", "return")]));
        assert!(!report.detected(FingerprintTechniques::WEBRTC));
    }

    #[test]
    fn test_stun_server_value() {
        let report = detect(&[], &storage("https://x.com/", &[("servers", "stun.l.google.com:19302")]));
        assert!(report.detected(FingerprintTechniques::WEBRTC));

        let report = detect(&[], &storage("https://x.com/", &[("relay", "turn:relay.example.net:3478")]));
        assert!(report.detected(FingerprintTechniques::WEBRTC));
    }

    #[test]
    fn test_webrtc_storage_keys() {
        for key in ["iceServers", "stun_server", "turn-url", "ice_candidate", "webrtcLeak"] {
            let report = detect(&[], &storage("https://x.com/", &[(key, "1")]));
            assert!(report.detected(FingerprintTechniques::WEBRTC), "{}", key);
        }
    }

    #[test]
    fn test_dynamic_cookies_scanned() {
        let mut page = PageStorage::default();
        page.dynamic_cookies.push(Cookie::new("deviceid", "x.com"));
        let snapshot = StorageSnapshot::from([("https://x.com/".to_string(), page)]);
        let report = detect(&[], &snapshot);
        assert!(report.detected(FingerprintTechniques::PERSISTENT_IDENTIFIERS));
    }

    #[test]
    fn test_map_keys() {
        let report = detect(&[], &storage("https://x.com/", &[("battery", "1")]));
        let map = report.to_map();
        assert_eq!(map["battery_fingerprinting"], true);
        assert_eq!(map["canvas_fingerprinting"], false);
        assert_eq!(report.evidence[0].technique, "battery_fingerprinting");
    }
}
