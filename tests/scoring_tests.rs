/// Unit tests for scoring math, similarity heuristics and input validation
use sdr_api::evaluation_service::similarity_score;
use sdr_api::lead_service::is_valid_email;
use sdr_api::scoring::{clamp_score, default_criteria, weighted_average};

#[cfg(test)]
mod weighted_average_tests {
    use super::*;

    #[test]
    fn two_criteria_weighted_average() {
        // weights {A: 1.0, B: 2.0}, scores {A: 5, B: 8} => (1*5 + 2*8)/3 = 7.0
        let avg = weighted_average(&[(1.0, 5.0), (2.0, 8.0)]);
        assert!((avg - 7.0).abs() < 1e-9);
    }

    #[test]
    fn single_criterion_returns_its_score() {
        assert_eq!(weighted_average(&[(2.5, 6.0)]), 6.0);
    }

    #[test]
    fn heavier_weight_dominates() {
        let avg = weighted_average(&[(10.0, 9.0), (0.1, 1.0)]);
        assert!(avg > 8.5);
    }

    #[test]
    fn empty_and_zero_weight_inputs_yield_zero() {
        assert_eq!(weighted_average(&[]), 0.0);
        assert_eq!(weighted_average(&[(0.0, 10.0), (0.0, 3.0)]), 0.0);
    }

    #[test]
    fn default_criteria_weighted_average_with_uniform_scores() {
        // Uniform per-criterion scores must produce that same score
        let pairs: Vec<(f64, f64)> = default_criteria()
            .iter()
            .map(|(_, _, weight, _)| (*weight, 7.0))
            .collect();
        let avg = weighted_average(&pairs);
        assert!((avg - 7.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod clamp_tests {
    use super::*;

    #[test]
    fn clamps_to_display_range() {
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(0.0), 0.0);
        assert_eq!(clamp_score(5.5), 5.5);
        assert_eq!(clamp_score(10.0), 10.0);
        assert_eq!(clamp_score(100.0), 10.0);
    }
}

#[cfg(test)]
mod similarity_tests {
    use super::*;

    #[test]
    fn exact_match_is_one() {
        assert_eq!(similarity_score("total_score", "total_score"), 1.0);
    }

    #[test]
    fn case_and_whitespace_insensitive_match_is_one() {
        assert_eq!(similarity_score("Hi Sarah", "  hi sarah  "), 1.0);
    }

    #[test]
    fn expected_contained_in_longer_actual_scores_high() {
        let actual = "Hi Sarah, I noticed Amazon's operations team is growing fast.";
        let score = similarity_score("Hi Sarah", actual);
        // Full word overlap (0.8) plus a small length bonus
        assert!(score >= 0.8 && score < 1.0);
    }

    #[test]
    fn json_key_match_scores_above_threshold() {
        let expected = r#"{"qualification_score": 85}"#;
        let score = similarity_score(expected, r#"{"qualification_score": 85}"#);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn unrelated_output_scores_below_pass_threshold() {
        let score = similarity_score("total_score", "I cannot help with that request.");
        assert!(score < 0.7);
    }

    #[test]
    fn empty_expected_is_zero() {
        assert_eq!(similarity_score("", "some output"), 0.0);
    }
}

#[cfg(test)]
mod email_validation_tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@company.co.uk"));
        assert!(is_valid_email("user+tag@example.org"));
        assert!(is_valid_email("user_name@example-domain.com"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@examplecom"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email(""));
    }
}
