/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use proptest::prelude::*;
use sdr_api::evaluation_service::similarity_score;
use sdr_api::grok_client::extract_json;
use sdr_api::lead_service::is_valid_email;
use sdr_api::scoring::{clamp_score, weighted_average};

// Property: similarity is a bounded heuristic
proptest! {
    #[test]
    fn similarity_never_panics(expected in "\\PC*", actual in "\\PC*") {
        let _ = similarity_score(&expected, &actual);
    }

    #[test]
    fn similarity_stays_in_unit_interval(expected in "\\PC{0,200}", actual in "\\PC{0,200}") {
        let score = similarity_score(&expected, &actual);
        prop_assert!((0.0..=1.0).contains(&score), "out of range: {}", score);
    }

    #[test]
    fn similarity_of_text_with_itself_is_one(text in "[a-z ]{1,80}") {
        prop_assume!(!text.trim().is_empty());
        prop_assert_eq!(similarity_score(&text, &text), 1.0);
    }
}

// Property: weighted average is bounded by its inputs
proptest! {
    #[test]
    fn weighted_average_bounded_by_min_and_max_score(
        pairs in prop::collection::vec((0.1f64..10.0, 0.0f64..10.0), 1..10)
    ) {
        let avg = weighted_average(&pairs);
        let min = pairs.iter().map(|(_, s)| *s).fold(f64::INFINITY, f64::min);
        let max = pairs.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(avg >= min - 1e-9 && avg <= max + 1e-9,
            "avg {} outside [{}, {}]", avg, min, max);
    }

    #[test]
    fn weighted_average_of_uniform_scores_is_that_score(
        weights in prop::collection::vec(0.1f64..10.0, 1..10),
        score in 0.0f64..10.0
    ) {
        let pairs: Vec<(f64, f64)> = weights.iter().map(|w| (*w, score)).collect();
        let avg = weighted_average(&pairs);
        prop_assert!((avg - score).abs() < 1e-9);
    }
}

// Property: clamping always lands in the display range
proptest! {
    #[test]
    fn clamp_score_stays_in_display_range(score in -1e6f64..1e6) {
        let clamped = clamp_score(score);
        prop_assert!((0.0..=10.0).contains(&clamped));
    }

    #[test]
    fn clamp_score_is_identity_inside_range(score in 0.0f64..=10.0) {
        prop_assert_eq!(clamp_score(score), score);
    }
}

// Property: parsers are total over arbitrary input
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn extract_json_never_panics(text in "\\PC*") {
        let _ = extract_json(&text);
    }

    #[test]
    fn extract_json_roundtrips_valid_objects(score in 0u32..100, reason in "[a-z]{1,20}") {
        let text = format!(r#"{{"qualification_score": {}, "reason": "{}"}}"#, score, reason);
        let value = extract_json(&text);
        prop_assert!(value.is_some());
        prop_assert_eq!(value.unwrap()["qualification_score"].as_u64(), Some(score as u64));
    }

    #[test]
    fn extract_json_finds_object_inside_prose(
        prefix in "[a-zA-Z ]{0,40}",
        score in 0u32..100
    ) {
        // Prose around a JSON object must not defeat extraction
        prop_assume!(!prefix.contains('{') && !prefix.contains('}'));
        let text = format!(r#"{}{{"total_score": {}}} thanks"#, prefix, score);
        let value = extract_json(&text);
        prop_assert!(value.is_some());
    }
}
