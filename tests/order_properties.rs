//! Properties of the order check that must hold for every window.
//!
//! Instants are drawn from a narrow range so ties are common, and windows
//! mix in unparseable entries.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::Config;

use feed_order_monitor::evidence::{parse_table_row, table_row};
use feed_order_monitor::order_check::{expected_order, validate, TimePoint, Violation};

fn time_point() -> impl Strategy<Value = TimePoint> {
    prop_oneof![
        4 => (0_i64..12).prop_map(|minute| {
            TimePoint::At(Utc.timestamp_opt(1_740_300_000 + minute * 60, 0).unwrap())
        }),
        1 => Just(TimePoint::Unparseable),
    ]
}

fn window() -> impl Strategy<Value = Vec<TimePoint>> {
    prop::collection::vec(time_point(), 0..40)
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn ordered_exactly_when_equal_to_stable_sort(s in window()) {
        let v = validate(&s);
        prop_assert_eq!(v.violations.is_empty(), expected_order(&s) == s);
        prop_assert_eq!(v.expected_order.len(), s.len());
    }

    #[test]
    fn validate_is_deterministic(s in window()) {
        prop_assert_eq!(validate(&s), validate(&s));
    }

    #[test]
    fn sorted_window_has_no_violations(s in window()) {
        let sorted = expected_order(&s);
        prop_assert!(validate(&sorted).violations.is_empty());
    }

    #[test]
    fn violations_point_at_real_mismatches(s in window()) {
        let v = validate(&s);
        for violation in &v.violations {
            let i = violation.position - 1;
            prop_assert_eq!(violation.actual, s[i]);
            prop_assert_eq!(violation.expected, v.expected_order[i]);
            prop_assert_ne!(violation.actual, violation.expected);
        }
    }

    #[test]
    fn table_row_round_trips(
        position in 1_usize..10_000,
        actual in time_point(),
        expected in time_point()
    ) {
        let violation = Violation { position, actual, expected };
        prop_assert_eq!(parse_table_row(&table_row(&violation)), Some(violation));
    }
}
