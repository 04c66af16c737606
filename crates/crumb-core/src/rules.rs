//! Rule-based classification
//!
//! The rule tables are plain static data so that each rule can be tested and
//! extended on its own. Evaluation order is fixed and the first match wins:
//!
//! 1. domain substring rules
//! 2. name regex rules (Necessary, Functional, Performance, Targeting)
//! 3. keyword rules against the name, then against short values
//! 4. heuristics (see [`crate::heuristics`])
//! 5. default `Other`

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::heuristics;
use crate::types::{Category, ClassificationMethod, Cookie};

/// Values at or above this length are not searched for keywords.
pub const MAX_KEYWORD_VALUE_LEN: usize = 50;

// =============================================================================
// Rule Tables
// =============================================================================

/// Maps a substring of the cookie domain to a category.
#[derive(Debug, Clone, Copy)]
pub struct DomainRule {
    pub pattern: &'static str,
    pub category: Category,
}

/// Case-insensitive regex tested against the cookie name.
#[derive(Debug, Clone, Copy)]
pub struct NameRule {
    pub pattern: &'static str,
    pub category: Category,
}

/// Substring searched in the lowercased name and short values.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keyword: &'static str,
    pub category: Category,
}

const fn domain(pattern: &'static str, category: Category) -> DomainRule {
    DomainRule { pattern, category }
}

const fn name(pattern: &'static str, category: Category) -> NameRule {
    NameRule { pattern, category }
}

const fn keyword(keyword: &'static str, category: Category) -> KeywordRule {
    KeywordRule { keyword, category }
}

use Category::{Functional, Performance, StrictlyNecessary, Targeting};

pub static DOMAIN_RULES: &[DomainRule] = &[
    domain("google-analytics.com", Performance),
    domain("analytics", Performance),
    domain("googletagmanager.com", Performance),
    domain("doubleclick.net", Targeting),
    domain("facebook.com", Targeting),
    domain("fb.com", Targeting),
    domain("bing.com", Targeting),
    domain("twitter.com", Targeting),
    domain("linkedin.com", Targeting),
    domain("youtube.com", Targeting),
];

pub static NAME_RULES: &[NameRule] = &[
    // Session, security and consent state
    name(r"^(sess|session|PHPSESSID|wordpress_logged_in|wp-settings|auth|secure|csrf|xsrf|_token|sid)", StrictlyNecessary),
    name(r"^(consent|cookie_consent|cc_|cookieconsent|privacy)", StrictlyNecessary),
    name(r"^(cf_|__cf|cloudflare)", StrictlyNecessary),
    // Preferences
    name(r"^(prefs|preferences|language|lang|locale|region|country|timezone|_locale)", Functional),
    name(r"^(settings|config|theme|layout|view|display)", Functional),
    // Analytics
    name(r"^(_ga|_gid|_gat|_utm|__utm|_pk_|pk_|piwik|matomo|sc_|_hjid|_hjSessionUser)", Performance),
    name(r"(analytics|metric|collect|track|visit|stats|event|perf)", Performance),
    // Advertising
    name(r"^(_fbp|_fbc|fr|tr|_gcl_|_uetsid|_uetvid|_pinterest|lidc|bcookie)", Targeting),
    name(r"(adv|ads|banner|campaign|promo|recommendation|retarget|affiliate|market|special)", Targeting),
];

pub static KEYWORD_RULES: &[KeywordRule] = &[
    keyword("session", StrictlyNecessary),
    keyword("csrf", StrictlyNecessary),
    keyword("security", StrictlyNecessary),
    keyword("language", StrictlyNecessary),
    keyword("preference", StrictlyNecessary),
    keyword("necessary", StrictlyNecessary),
    keyword("functional", Functional),
    keyword("settings", Functional),
    keyword("customization", Functional),
    keyword("analytics", Performance),
    keyword("statistics", Performance),
    keyword("stats", Performance),
    keyword("performance", Performance),
    keyword("tracking", Performance),
    keyword("measure", Performance),
    keyword("advertising", Targeting),
    keyword("advert", Targeting),
    keyword("targeting", Targeting),
    keyword("remarketing", Targeting),
    keyword("campaign", Targeting),
    keyword("partner", Targeting),
    keyword("affiliate", Targeting),
];

// =============================================================================
// Rule Match
// =============================================================================

/// Stage of the rule procedure that produced a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStage {
    Domain,
    Name,
    Keyword,
    Heuristic,
    Default,
}

/// Result of rule-based classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub category: Category,
    pub stage: RuleStage,
}

impl RuleMatch {
    /// Provenance label recorded on the classified cookie.
    pub fn method(&self) -> ClassificationMethod {
        match self.stage {
            RuleStage::Heuristic => ClassificationMethod::Heuristic,
            _ => ClassificationMethod::Rule,
        }
    }
}

// =============================================================================
// Rule Table
// =============================================================================

/// Compiled rule tables.
///
/// Compilation happens once; evaluation is read-only and can be shared
/// between threads.
#[derive(Debug)]
pub struct RuleTable {
    domain_rules: Vec<DomainRule>,
    name_rules: Vec<(Regex, Category)>,
    keyword_rules: Vec<KeywordRule>,
}

static BUILTIN: LazyLock<RuleTable> =
    LazyLock::new(|| RuleTable::new(DOMAIN_RULES, NAME_RULES, KEYWORD_RULES));

impl RuleTable {
    /// Compile a rule table. Name patterns that fail to compile are skipped
    /// with a warning.
    pub fn new(domain_rules: &[DomainRule], name_rules: &[NameRule], keyword_rules: &[KeywordRule]) -> Self {
        let name_rules = name_rules
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(rule.pattern).case_insensitive(true).build() {
                    Ok(regex) => Some((regex, rule.category)),
                    Err(e) => {
                        log::warn!("Skipping invalid name rule '{}': {}", rule.pattern, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            domain_rules: domain_rules.to_vec(),
            name_rules,
            keyword_rules: keyword_rules.to_vec(),
        }
    }

    /// The built-in tables.
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN
    }

    /// Classify a cookie using rules, heuristics and the `Other` default.
    pub fn classify(&self, cookie: &Cookie, reference_time: f64) -> RuleMatch {
        if let Some(category) = self.match_domain(&cookie.domain) {
            return RuleMatch { category, stage: RuleStage::Domain };
        }

        if let Some(category) = self.match_name(&cookie.name) {
            return RuleMatch { category, stage: RuleStage::Name };
        }

        if let Some(category) = self.match_keywords(&cookie.name, &cookie.value) {
            return RuleMatch { category, stage: RuleStage::Keyword };
        }

        // Nameless records carry no shape worth judging.
        if cookie.name.is_empty() {
            return RuleMatch { category: Category::Other, stage: RuleStage::Default };
        }

        if let Some(heuristic) = heuristics::evaluate(cookie, reference_time) {
            return RuleMatch { category: heuristic.category(), stage: RuleStage::Heuristic };
        }

        RuleMatch { category: Category::Other, stage: RuleStage::Default }
    }

    /// Step 1: domain substring.
    pub fn match_domain(&self, domain: &str) -> Option<Category> {
        if domain.is_empty() {
            return None;
        }
        let domain = domain.to_ascii_lowercase();
        self.domain_rules
            .iter()
            .find(|rule| domain.contains(rule.pattern))
            .map(|rule| rule.category)
    }

    /// Step 2: name regex in table order.
    pub fn match_name(&self, name: &str) -> Option<Category> {
        if name.is_empty() {
            return None;
        }
        self.name_rules
            .iter()
            .find(|(regex, _)| regex.is_match(name))
            .map(|(_, category)| *category)
    }

    /// Step 3: keywords in the name first, then in short values.
    pub fn match_keywords(&self, name: &str, value: &str) -> Option<Category> {
        let name = name.to_lowercase();
        if let Some(rule) = self.keyword_rules.iter().find(|rule| name.contains(rule.keyword)) {
            return Some(rule.category);
        }

        if value.is_empty() || value.chars().count() >= MAX_KEYWORD_VALUE_LEN {
            return None;
        }
        let value = value.to_lowercase();
        self.keyword_rules
            .iter()
            .find(|rule| value.contains(rule.keyword))
            .map(|rule| rule.category)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(DOMAIN_RULES, NAME_RULES, KEYWORD_RULES)
    }
}

/// Classify a cookie with the built-in rule table.
pub fn classify_by_rule(cookie: &Cookie, reference_time: f64) -> Category {
    RuleTable::builtin().classify(cookie, reference_time).category
}
