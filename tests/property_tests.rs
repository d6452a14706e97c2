/// Property-based tests using proptest
/// Tests invariants of code normalization and classification for all inputs
use kardex_ingest::classifier::{classify_fields, AcademicStatus, LineFields};
use kardex_ingest::normalizer::{decode_term_code, normalize_course_code, split_full_name};
use proptest::prelude::*;

// Property: course codes are canonical 5-digit codes or pass through
proptest! {
    #[test]
    fn course_code_normalization_never_panics(raw in "\\PC*") {
        let _ = normalize_course_code(&raw);
    }

    #[test]
    fn short_codes_are_padded_to_five(code in "[0-9]{1,5}") {
        let normalized = normalize_course_code(&code).unwrap();
        prop_assert_eq!(normalized.len(), 5);
        prop_assert!(normalized.chars().all(|c| c.is_ascii_digit()));
        let significant = code.trim_start_matches('0');
        prop_assert!(normalized.ends_with(significant));
    }

    #[test]
    fn long_codes_pass_through(code in "[0-9]{6,12}") {
        prop_assert_eq!(normalize_course_code(&code).unwrap(), code);
    }

    #[test]
    fn normalization_is_idempotent(code in "[0-9]{1,8}") {
        let once = normalize_course_code(&code).unwrap();
        prop_assert_eq!(normalize_course_code(&once).unwrap(), once.clone());
    }
}

// Property: compact term codes decode to a well-formed label
proptest! {
    #[test]
    fn term_code_decoding_never_panics(raw in "\\PC*") {
        let _ = decode_term_code(&raw);
    }

    #[test]
    fn decoded_terms_are_consistent(a in 0u8..=9, b in 0u8..=9, c in 0u8..=9, d in 0u8..=9) {
        let raw = format!("{}{}{}{}", a, b, c, d);
        let term = decode_term_code(&raw).unwrap();
        prop_assert_eq!(term.year, 2000 + 10 * a as i32 + c as i32);
        prop_assert_eq!(term.cycle, d as i32);
        prop_assert_eq!(term.label, format!("{}-{}", term.year, term.cycle));
    }
}

// Property: name splitting keeps every token
proptest! {
    #[test]
    fn name_split_keeps_all_tokens(tokens in proptest::collection::vec("[A-Z]{1,8}", 2..6)) {
        let full = tokens.join("  ");
        let parts = split_full_name(&full);
        let rebuilt = [parts.given.as_str(), parts.paternal.as_str(), parts.maternal.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(rebuilt, tokens.join(" "));
    }
}

// Property: classification is total and consistent with its grade source
proptest! {
    #[test]
    fn classification_never_panics(
        ord in proptest::option::of(0.0f64..=100.0),
        reg in proptest::option::of(0.0f64..=100.0),
        primary in "\\PC{0,12}",
        secondary in "\\PC{0,12}",
        withdrawals in 0i32..3,
    ) {
        let fields = LineFields {
            ordinary: ord,
            extraordinary: reg,
            primary_flag: primary.trim().to_uppercase(),
            secondary_flag: secondary.trim().to_uppercase(),
            withdrawals,
        };
        let result = classify_fields(&fields);
        if withdrawals > 0 {
            prop_assert_eq!(result.status, AcademicStatus::Withdrawn);
        }
        if let Some(grade) = result.grade {
            prop_assert!(Some(grade) == reg || Some(grade) == ord);
        }
    }
}
