//! Order Validation
//!
//! Pure newest-first ordering check. Produces both the full expected order
//! (context for the report) and the minimal violation list (what gets
//! persisted), in one pass over the observed window.

use serde::{Deserialize, Serialize};

use super::timepoint::TimePoint;

/// A position where the observed order departs from the expected order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// 1-based position in the observed sequence
    pub position: usize,
    pub actual: TimePoint,
    pub expected: TimePoint,
}

impl Violation {
    /// `Position <n>: <actual> (should be <expected>)`
    pub fn describe(&self) -> String {
        format!(
            "Position {}: {} (should be {})",
            self.position, self.actual, self.expected
        )
    }
}

/// Result of validating one observed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub expected_order: Vec<TimePoint>,
    pub violations: Vec<Violation>,
}

impl Validation {
    pub fn is_ordered(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Stable newest-first sort of the observed window.
///
/// `sort_by` is stable, so equal instants (and runs of unparseable entries)
/// keep their original relative order.
pub fn expected_order(observed: &[TimePoint]) -> Vec<TimePoint> {
    let mut sorted = observed.to_vec();
    sorted.sort_by(TimePoint::cmp_newest_first);
    sorted
}

/// Compare the observed window against its stable descending sort.
pub fn validate(observed: &[TimePoint]) -> Validation {
    let expected_order = expected_order(observed);

    let violations = observed
        .iter()
        .zip(expected_order.iter())
        .enumerate()
        .filter(|(_, (actual, expected))| actual != expected)
        .map(|(i, (actual, expected))| Violation {
            position: i + 1,
            actual: *actual,
            expected: *expected,
        })
        .collect();

    Validation {
        expected_order,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32) -> TimePoint {
        TimePoint::At(Utc.with_ymd_and_hms(2025, 2, 23, h, m, 0).unwrap())
    }

    #[test]
    fn test_empty_and_singleton_are_ordered() {
        assert!(validate(&[]).is_ordered());
        assert!(validate(&[]).expected_order.is_empty());

        let v = validate(&[at(10, 0)]);
        assert!(v.is_ordered());
        assert_eq!(v.expected_order, vec![at(10, 0)]);
    }

    #[test]
    fn test_swapped_tail_reports_both_positions() {
        let observed = vec![at(12, 0), at(11, 0), at(11, 30)];
        let v = validate(&observed);

        assert_eq!(v.expected_order, vec![at(12, 0), at(11, 30), at(11, 0)]);
        assert_eq!(
            v.violations,
            vec![
                Violation { position: 2, actual: at(11, 0), expected: at(11, 30) },
                Violation { position: 3, actual: at(11, 30), expected: at(11, 0) },
            ]
        );
    }

    #[test]
    fn test_unparseable_entry_sinks_to_the_end() {
        let observed = vec![at(10, 0), TimePoint::Unparseable, at(9, 0)];
        let v = validate(&observed);

        assert_eq!(
            v.expected_order,
            vec![at(10, 0), at(9, 0), TimePoint::Unparseable]
        );
        assert_eq!(
            v.violations,
            vec![
                Violation { position: 2, actual: TimePoint::Unparseable, expected: at(9, 0) },
                Violation { position: 3, actual: at(9, 0), expected: TimePoint::Unparseable },
            ]
        );
    }

    #[test]
    fn test_all_unparseable_reports_nothing() {
        let observed = vec![TimePoint::Unparseable; 5];
        assert!(validate(&observed).is_ordered());
    }

    #[test]
    fn test_equal_instants_are_not_swaps() {
        let observed = vec![at(12, 0), at(11, 0), at(11, 0), at(10, 0)];
        assert!(validate(&observed).is_ordered());

        // the tie pair is out of place as a block, but never against itself
        let observed = vec![at(11, 0), at(11, 0), at(12, 0)];
        let positions: Vec<usize> = validate(&observed)
            .violations
            .iter()
            .map(|v| v.position)
            .collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn test_empty_iff_already_sorted() {
        let windows = vec![
            vec![at(9, 0), at(10, 0)],
            vec![at(10, 0), at(9, 0)],
            vec![at(10, 0), TimePoint::Unparseable, TimePoint::Unparseable],
            vec![TimePoint::Unparseable, at(10, 0)],
            vec![at(8, 0), at(8, 0), at(9, 0), at(7, 0)],
        ];
        for w in windows {
            let v = validate(&w);
            assert_eq!(v.is_ordered(), expected_order(&w) == w, "window {:?}", w);
        }
    }

    #[test]
    fn test_validate_is_deterministic() {
        let observed = vec![at(8, 0), TimePoint::Unparseable, at(9, 15), at(9, 15), at(7, 0)];
        assert_eq!(validate(&observed), validate(&observed));
    }

    #[test]
    fn test_describe_line() {
        let v = Violation { position: 4, actual: at(9, 0), expected: TimePoint::Unparseable };
        assert_eq!(
            v.describe(),
            "Position 4: 2025-02-23T09:00:00+00:00 (should be Invalid Date)"
        );
    }
}
