//! Timestamp Normalization
//!
//! Converts raw timestamp tokens scraped from the listing into comparable
//! instants. A token that cannot be read never aborts the batch; it becomes
//! an explicit `TimePoint::Unparseable` so the validator can localize it.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Raw token as extracted from one feed item (absent when the item had no age element).
pub type RawEntry = Option<String>;

/// Text used for an unparseable instant in every sink and report.
pub const UNPARSEABLE_TEXT: &str = "Invalid Date";

/// Zone-less ISO-8601 layouts accepted from the listing markup.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// A normalized instant, or an explicit marker that the entry could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum TimePoint {
    At(DateTime<Utc>),
    Unparseable,
}

impl TimePoint {
    pub fn is_parseable(&self) -> bool {
        matches!(self, Self::At(_))
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(t) => Some(*t),
            Self::Unparseable => None,
        }
    }

    /// Newest-first ordering. Every valid instant sorts ahead of every
    /// unparseable one; unparseable entries compare equal to each other so a
    /// stable sort keeps their original relative order.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::At(a), Self::At(b)) => b.cmp(a),
            (Self::At(_), Self::Unparseable) => Ordering::Less,
            (Self::Unparseable, Self::At(_)) => Ordering::Greater,
            (Self::Unparseable, Self::Unparseable) => Ordering::Equal,
        }
    }

    /// Inverse of `Display`: accepts only the exact text this type renders.
    /// Anything else, including a truncated rendering, is rejected.
    pub fn from_rendered(s: &str) -> Option<Self> {
        if s == UNPARSEABLE_TEXT {
            return Some(Self::Unparseable);
        }
        let t = DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc);
        let tp = Self::At(t);
        (tp.to_string() == s).then_some(tp)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Unparseable => f.write_str(UNPARSEABLE_TEXT),
        }
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(t: DateTime<Utc>) -> Self {
        Self::At(t)
    }
}

/// Normalize one raw entry.
///
/// Accepts RFC 3339, zone-less ISO-8601 (read as UTC), an ISO value followed
/// by further whitespace-separated tokens (the listing appends a unix epoch to
/// its `title` attribute), and a bare unix-epoch seconds token.
pub fn normalize(raw: Option<&str>) -> TimePoint {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return TimePoint::Unparseable;
    };

    if let Some(t) = parse_instant(raw) {
        return TimePoint::At(t);
    }

    // "2025-02-23T12:34:56 1740314096"
    let mut tokens = raw.split_whitespace();
    if let Some(first) = tokens.next() {
        if let Some(t) = parse_instant(first) {
            return TimePoint::At(t);
        }
        if tokens.next().is_none() {
            if let Some(t) = parse_epoch(first) {
                return TimePoint::At(t);
            }
        }
    }

    TimePoint::Unparseable
}

/// Normalize a whole extracted window, preserving feed order.
pub fn normalize_all(raw: &[RawEntry]) -> Vec<TimePoint> {
    raw.iter().map(|r| normalize(r.as_deref())).collect()
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = s.parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_listing_title_with_epoch_suffix() {
        let tp = normalize(Some("2025-02-23T12:34:56 1740314096"));
        assert_eq!(tp, TimePoint::At(utc("2025-02-23T12:34:56Z")));
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let tp = normalize(Some("2025-02-23T14:34:56+02:00"));
        assert_eq!(tp, TimePoint::At(utc("2025-02-23T12:34:56Z")));
    }

    #[test]
    fn test_bare_epoch() {
        let tp = normalize(Some("1740314096"));
        assert_eq!(tp.instant().map(|t| t.timestamp()), Some(1_740_314_096));
    }

    #[test]
    fn test_absent_and_malformed_are_unparseable() {
        assert_eq!(normalize(None), TimePoint::Unparseable);
        assert_eq!(normalize(Some("   ")), TimePoint::Unparseable);
        assert_eq!(normalize(Some("3 hours ago")), TimePoint::Unparseable);
        assert_eq!(normalize(Some("2025-13-45T99:00:00")), TimePoint::Unparseable);
    }

    #[test]
    fn test_rendered_text_normalizes_back() {
        let tp = TimePoint::At(utc("2025-02-23T12:34:56Z"));
        assert_eq!(normalize(Some(&tp.to_string())), tp);
        assert_eq!(normalize(Some(UNPARSEABLE_TEXT)), TimePoint::Unparseable);
    }

    #[test]
    fn test_from_rendered_rejects_partial_text() {
        let tp = TimePoint::At(utc("2025-02-23T11:00:00Z"));
        assert_eq!(TimePoint::from_rendered("2025-02-23T11:00:00+00:00"), Some(tp));
        assert_eq!(TimePoint::from_rendered(UNPARSEABLE_TEXT), Some(TimePoint::Unparseable));
        assert_eq!(TimePoint::from_rendered("2025-02-23T11:00:00+00:0"), None);
        assert_eq!(TimePoint::from_rendered("2025-02-23T11:00:00"), None);
        assert_eq!(TimePoint::from_rendered("2025-02-2"), None);
        assert_eq!(TimePoint::from_rendered("Invalid Da"), None);
    }

    #[test]
    fn test_unparseable_sorts_after_valid() {
        let old = TimePoint::At(utc("1970-01-01T00:00:00Z"));
        assert_eq!(old.cmp_newest_first(&TimePoint::Unparseable), Ordering::Less);
        assert_eq!(
            TimePoint::Unparseable.cmp_newest_first(&TimePoint::Unparseable),
            Ordering::Equal
        );
    }

    #[test]
    fn test_normalize_all_keeps_order() {
        let raw = vec![Some("2025-02-23T12:00:00".to_string()), None];
        let out = normalize_all(&raw);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_parseable());
        assert!(!out[1].is_parseable());
    }
}
