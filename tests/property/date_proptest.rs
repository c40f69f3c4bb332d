//! Property-based tests for date normalization

use chrono::NaiveDate;
use proptest::prelude::*;
use rollcall::shared::date::{format_day, normalize, parse_day};

fn any_day() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(year, month, day)| NaiveDate::from_ymd_opt(year, month, day).unwrap())
}

proptest! {
    #[test]
    fn test_timestamp_suffix_is_stripped(
        day in any_day(),
        hour in 0u32..24,
        minute in 0u32..60,
        zone in prop_oneof![Just("Z"), Just("+00:00"), Just("-03:00"), Just("")],
        separator in prop_oneof![Just('T'), Just(' ')],
    ) {
        let canonical = format_day(day);
        let raw = format!("{}{}{:02}:{:02}:00{}", canonical, separator, hour, minute, zone);
        prop_assert_eq!(normalize(Some(&raw)), canonical.clone());
        prop_assert_eq!(parse_day(&raw).unwrap(), day);
    }

    #[test]
    fn test_normalize_is_idempotent(raw in ".{0,40}") {
        let once = normalize(Some(&raw));
        prop_assert_eq!(normalize(Some(&once)), once.clone());
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored(day in any_day(), pad in "[ \t]{0,4}") {
        let raw = format!("{}{}{}", pad, format_day(day), pad);
        prop_assert_eq!(parse_day(&raw).unwrap(), day);
    }

    #[test]
    fn test_garbage_never_parses(raw in "[a-zA-Z]{1,12}") {
        prop_assert!(parse_day(&raw).is_err());
    }
}
