//! Consent banner selectors
//!
//! Interaction happens in page JavaScript: the generated script looks for a
//! banner, then clicks the first visible reject button, falling back to the
//! settings dialog and a save/reject button inside it.

use serde::Serialize;

/// CSS selectors and button labels for common consent managers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConsentSelectors {
    pub banner: &'static [&'static str],
    pub reject: &'static [&'static str],
    pub reject_labels: &'static [&'static str],
    pub settings: &'static [&'static str],
    pub settings_labels: &'static [&'static str],
    /// Buttons that confirm a settings dialog after everything is deselected.
    pub save_labels: &'static [&'static str],
}

pub static BANNER_SELECTORS: &[&str] = &[
    // OneTrust
    "#onetrust-banner-sdk",
    "#onetrust-consent-sdk",
    // Cookiebot
    "#CybotCookiebotDialog",
    "[data-cookieconsent='dialog']",
    // Cookie-Script
    "#cookiescript_injected",
    // Usercentrics
    "#usercentrics-root",
    // Generic
    "[aria-label='Cookie Consent']",
    "[aria-label='Cookie-Banner']",
    "[class*='cookie-banner']",
    "[class*='cookie-consent']",
    "[class*='cookiebanner']",
    "[id*='cookie-banner']",
    "[id*='cookie-consent']",
    "#cookiebanner",
    ".cookie-notification",
    ".cookieNotice",
];

pub static REJECT_SELECTORS: &[&str] = &[
    "#onetrust-reject-all-handler",
    ".onetrust-close-btn-handler",
    "button[data-cui-consent-action='decline']",
    "#CybotCookiebotDialogBodyButtonDecline",
    ".cookie-script-decline-button",
    "[data-testid='uc-deny-all-button']",
    "[aria-label='Ablehnen']",
    "[aria-label='Deny']",
    "[aria-label='Reject']",
    "[title='Ablehnen']",
    "[title='Deny']",
    "[title='Reject']",
];

pub static REJECT_LABELS: &[&str] = &["ablehnen", "nur notwendige", "deny", "decline", "reject", "refuse"];

pub static SETTINGS_SELECTORS: &[&str] = &[
    "#onetrust-pc-btn-handler",
    "button.CybotCookiebotDialogBodyButton[data-cui-denial-action='settings']",
    "#CybotCookiebotDialogBodyButtonDetails",
    "[data-testid='uc-settings-button']",
    "[aria-label='Cookie-Einstellungen']",
    "[aria-label='Cookie settings']",
    "[title='Einstellungen']",
    "[title='Settings']",
];

pub static SETTINGS_LABELS: &[&str] = &["cookie-einstellungen", "einstellungen", "cookie settings", "settings"];

pub static SAVE_LABELS: &[&str] = &["speichern", "save", "submit"];

impl ConsentSelectors {
    pub const fn builtin() -> Self {
        Self {
            banner: BANNER_SELECTORS,
            reject: REJECT_SELECTORS,
            reject_labels: REJECT_LABELS,
            settings: SETTINGS_SELECTORS,
            settings_labels: SETTINGS_LABELS,
            save_labels: SAVE_LABELS,
        }
    }

    /// Script that returns `true` if a banner is present.
    pub fn detect_script(&self) -> String {
        format!(
            "const sels = {};\nreturn sels.some(s => {{ try {{ return !!document.querySelector(s); }} catch (e) {{ return false; }} }});",
            js_array(self.banner)
        )
    }

    /// Script that tries to reject consent. Returns the action taken as a
    /// string (`"reject"`, `"settings"`) or `null`.
    pub fn interact_script(&self) -> String {
        format!(
            r#"const reject = {reject};
const rejectLabels = {reject_labels};
const settings = {settings};
const settingsLabels = {settings_labels};
const saveLabels = {save_labels};
const visible = el => !!el && el.offsetParent !== null;
const bySelector = sels => {{
  for (const s of sels) {{
    let el = null;
    try {{ el = document.querySelector(s); }} catch (e) {{ continue; }}
    if (visible(el)) return el;
  }}
  return null;
}};
const byLabel = labels => {{
  const buttons = Array.from(document.querySelectorAll("button, [role='button'], a"));
  return buttons.find(b => visible(b) && labels.some(l => (b.textContent || "").trim().toLowerCase().includes(l))) || null;
}};
let el = bySelector(reject) || byLabel(rejectLabels);
if (el) {{ el.click(); return "reject"; }}
el = bySelector(settings) || byLabel(settingsLabels);
if (!el) return null;
el.click();
document.querySelectorAll("input[type='checkbox']:checked:not([disabled])").forEach(c => c.click());
el = bySelector(reject) || byLabel(rejectLabels.concat(saveLabels)) || document.querySelector("button[type='submit']");
if (el) el.click();
return "settings";"#,
            reject = js_array(self.reject),
            reject_labels = js_array(self.reject_labels),
            settings = js_array(self.settings),
            settings_labels = js_array(self.settings_labels),
            save_labels = js_array(self.save_labels),
        )
    }
}

impl Default for ConsentSelectors {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Render a string slice as a JavaScript array literal.
fn js_array(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_tables_not_empty() {
        let selectors = ConsentSelectors::builtin();
        assert!(!selectors.banner.is_empty());
        assert!(!selectors.reject.is_empty());
        assert!(!selectors.settings.is_empty());
    }

    #[test]
    fn test_labels_are_lowercase() {
        let selectors = ConsentSelectors::builtin();
        for label in selectors.reject_labels.iter().chain(selectors.settings_labels).chain(selectors.save_labels) {
            assert_eq!(*label, label.to_lowercase());
        }
    }

    #[test]
    fn test_scripts_embed_tables() {
        let selectors = ConsentSelectors::builtin();
        let script = selectors.interact_script();
        assert!(script.contains("#onetrust-reject-all-handler"));
        assert!(script.contains(r#"[data-testid='uc-deny-all-button']"#));
        assert!(selectors.detect_script().contains("#CybotCookiebotDialog"));
    }

    #[test]
    fn test_js_array_escapes_quotes() {
        assert_eq!(js_array(&["a\"b"]), r#"["a\"b"]"#);
    }
}
