//! Property-based tests for request validation

use proptest::prelude::*;

use snippets::shared::validation::{is_valid_name, is_valid_password, parse_cursor, validate_post};

proptest! {
    #[test]
    fn test_well_formed_names_accepted(name in "[A-Za-z0-9_]{1,15}") {
        prop_assert!(is_valid_name(&name));
    }

    #[test]
    fn test_long_names_rejected(name in "[A-Za-z0-9_]{16,40}") {
        prop_assert!(!is_valid_name(&name));
    }

    #[test]
    fn test_password_with_all_classes_accepted(
        upper in "[A-Z]{1,4}",
        lower in "[a-z]{1,4}",
        digits in "[0-9]{1,4}",
        special in "[!@#$%^&*]{1,4}",
        padding in "[a-z]{5}",
    ) {
        let password = format!("{upper}{lower}{digits}{special}{padding}");
        prop_assert!(is_valid_password(&password));
    }

    #[test]
    fn test_password_without_digit_rejected(password in "[A-Za-z!@#]{8,20}") {
        prop_assert!(!is_valid_password(&password));
    }

    #[test]
    fn test_post_limits_count_characters(title_len in 1usize..=50, body_len in 1usize..=200) {
        let title = "ü".repeat(title_len);
        let body = "ß".repeat(body_len);
        prop_assert!(validate_post(&title, &body).is_ok());
        prop_assert!(validate_post(&"ü".repeat(51), &body).is_err());
    }

    #[test]
    fn test_cursor_accepts_rfc3339(secs in 0i64..4_000_000_000) {
        let at = chrono::DateTime::from_timestamp(secs, 0).unwrap();
        let parsed = parse_cursor(Some(&at.to_rfc3339())).unwrap();
        prop_assert_eq!(parsed, at);
    }
}
