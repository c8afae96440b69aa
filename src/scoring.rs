use serde_json::json;

/// Weighted average over (weight, score) pairs: sum(w * s) / sum(w).
/// Returns 0.0 when there is nothing to average or the weights sum to zero.
pub fn weighted_average(pairs: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = pairs.iter().map(|(w, _)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = pairs.iter().map(|(w, s)| w * s).sum();
    weighted_sum / total_weight
}

/// Clamps a lead score to the display range [0, 10].
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 10.0)
}

/// The four built-in scoring criteria seeded by POST /api/scoring/criteria/defaults.
/// Returns (name, description, weight, rules-json) tuples.
pub fn default_criteria() -> Vec<(&'static str, &'static str, f64, String)> {
    vec![
        (
            "Company Size",
            "Score based on company size and potential budget",
            3.0,
            json!({
                "enterprise": 10,
                "large": 8,
                "medium": 6,
                "small": 3,
                "startup": 2
            })
            .to_string(),
        ),
        (
            "Job Title Authority",
            "Score based on decision-making authority",
            2.5,
            json!({
                "c_level": 10,
                "vp_director": 8,
                "manager": 6,
                "individual_contributor": 3,
                "intern": 1
            })
            .to_string(),
        ),
        (
            "Industry Fit",
            "Score based on industry alignment with our solution",
            2.0,
            json!({
                "technology": 10,
                "finance": 8,
                "healthcare": 7,
                "manufacturing": 6,
                "retail": 5,
                "other": 3
            })
            .to_string(),
        ),
        (
            "Engagement Level",
            "Score based on lead engagement and responsiveness",
            1.5,
            json!({
                "high": 10,
                "medium": 6,
                "low": 3,
                "none": 1
            })
            .to_string(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_average_two_criteria() {
        // {A: weight 1.0, score 5} and {B: weight 2.0, score 8}
        // => (1*5 + 2*8) / 3 = 7.0
        let avg = weighted_average(&[(1.0, 5.0), (2.0, 8.0)]);
        assert!((avg - 7.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_equal_weights_is_mean() {
        let avg = weighted_average(&[(1.0, 4.0), (1.0, 6.0)]);
        assert!((avg - 5.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_average_empty_is_zero() {
        assert_eq!(weighted_average(&[]), 0.0);
    }

    #[test]
    fn weighted_average_zero_weights_is_zero() {
        assert_eq!(weighted_average(&[(0.0, 9.0)]), 0.0);
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(-1.5), 0.0);
        assert_eq!(clamp_score(4.2), 4.2);
        assert_eq!(clamp_score(15.0), 10.0);
    }

    #[test]
    fn default_criteria_are_four_with_descending_weights() {
        let defaults = default_criteria();
        assert_eq!(defaults.len(), 4);
        for pair in defaults.windows(2) {
            assert!(pair[0].2 >= pair[1].2);
        }
        // Rules blobs must stay parseable
        for (_, _, _, rules) in &defaults {
            assert!(serde_json::from_str::<serde_json::Value>(rules).is_ok());
        }
    }
}
