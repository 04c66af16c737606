//! Shape-based fallback classifiers
//!
//! Used only when no domain, name or keyword rule matched. They look at the
//! cookie's shape (session flag, lifetime, name) rather than its identity.

use crate::types::{Category, Cookie};

/// Lifetimes above 180 days are treated as tracking.
pub const LONG_LIFETIME_SECONDS: f64 = 15_552_000.0;

/// Names up to this length are candidates for the opaque-name heuristic.
pub const SHORT_NAME_MAX_LEN: usize = 5;

/// A heuristic that fired for a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    /// No expiry or explicit session flag
    SessionCookie,
    /// Expires more than 180 days after the reference time
    LongLifetime,
    /// Short alphanumeric name containing at least one digit
    ShortOpaqueName,
}

impl Heuristic {
    pub fn category(self) -> Category {
        match self {
            Self::SessionCookie => Category::StrictlyNecessary,
            Self::LongLifetime => Category::Targeting,
            Self::ShortOpaqueName => Category::Performance,
        }
    }
}

/// Evaluate the heuristics in fixed order; first hit wins.
pub fn evaluate(cookie: &Cookie, reference_time: f64) -> Option<Heuristic> {
    if cookie.is_session() {
        return Some(Heuristic::SessionCookie);
    }

    if let Some(lifetime) = cookie.lifetime(reference_time) {
        if lifetime > LONG_LIFETIME_SECONDS {
            return Some(Heuristic::LongLifetime);
        }
    }

    if is_short_opaque_name(&cookie.name) {
        return Some(Heuristic::ShortOpaqueName);
    }

    None
}

/// `_ga`-style short names: at most five ASCII alphanumerics, not all letters.
pub fn is_short_opaque_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= SHORT_NAME_MAX_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric())
        && !name.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn test_session_first() {
        let cookie = Cookie::new("a1", "x.com");
        assert_eq!(evaluate(&cookie, NOW), Some(Heuristic::SessionCookie));

        let mut flagged = Cookie::new("a1", "x.com").with_expires(NOW + 100.0);
        flagged.session = true;
        assert_eq!(evaluate(&flagged, NOW), Some(Heuristic::SessionCookie));
    }

    #[test]
    fn test_long_lifetime_before_short_name() {
        let cookie = Cookie::new("a1", "x.com").with_expires(NOW + LONG_LIFETIME_SECONDS + 1.0);
        assert_eq!(evaluate(&cookie, NOW), Some(Heuristic::LongLifetime));

        let boundary = Cookie::new("zzzzzz", "x.com").with_expires(NOW + LONG_LIFETIME_SECONDS);
        assert_eq!(evaluate(&boundary, NOW), None);
    }

    #[test]
    fn test_short_opaque_name() {
        assert!(is_short_opaque_name("a1b2"));
        assert!(is_short_opaque_name("12345"));
        assert!(!is_short_opaque_name("abcde"));
        assert!(!is_short_opaque_name("a1b2c3"));
        assert!(!is_short_opaque_name("a_1"));
        assert!(!is_short_opaque_name(""));

        let cookie = Cookie::new("x9", "x.com").with_expires(NOW + 60.0);
        assert_eq!(evaluate(&cookie, NOW), Some(Heuristic::ShortOpaqueName));
        assert_eq!(Heuristic::ShortOpaqueName.category(), Category::Performance);
    }
}
