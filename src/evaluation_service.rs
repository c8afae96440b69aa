use crate::errors::{AppError, ResultExt};
use crate::grok_client::GrokClient;
use crate::models::{Evaluation, EvaluationCase, EvaluationListParams, EvaluationSummary};
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

/// Pass threshold applied to the similarity score.
const PASS_THRESHOLD: f64 = 0.7;

/// Service for evaluating Grok output quality against fixed test cases.
pub struct EvaluationService {
    pool: PgPool,
    grok: GrokClient,
}

/// Similarity heuristic between expected and actual output.
///
/// Exact match (case/whitespace-insensitive) scores 1.0. Otherwise the score
/// is word overlap weighted at 0.8 plus length ratio weighted at 0.2,
/// clamped to 1.0. An empty expected output scores 0.0.
pub fn similarity_score(expected: &str, actual: &str) -> f64 {
    let expected_lower = expected.to_lowercase().trim().to_string();
    let actual_lower = actual.to_lowercase().trim().to_string();

    if expected_lower.is_empty() {
        return 0.0;
    }
    if expected_lower == actual_lower {
        return 1.0;
    }

    let expected_words: std::collections::HashSet<&str> =
        expected_lower.split_whitespace().collect();
    let actual_words: std::collections::HashSet<&str> = actual_lower.split_whitespace().collect();

    if expected_words.is_empty() {
        return 0.0;
    }

    let common = expected_words.intersection(&actual_words).count();
    let overlap = common as f64 / expected_words.len() as f64;

    let (shorter, longer) = (
        expected_lower.len().min(actual_lower.len()),
        expected_lower.len().max(actual_lower.len()),
    );
    let length_ratio = if longer == 0 {
        0.0
    } else {
        shorter as f64 / longer as f64
    };

    ((overlap * 0.8) + (length_ratio * 0.2)).min(1.0)
}

/// The built-in evaluation suite seeded by POST /api/evaluations/run-defaults.
pub fn default_cases() -> Vec<EvaluationCase> {
    vec![
        EvaluationCase {
            test_name: "Lead Qualification - High Value Prospect".to_string(),
            prompt_template: "Qualify lead for enterprise software sales".to_string(),
            test_input: r#"You are an expert Sales Development Representative (SDR) AI assistant. Analyze the following lead information and provide a qualification assessment.

Lead Information:
- Name: John Smith
- Email: john.smith@microsoft.com
- Company: Microsoft
- Job Title: VP of Engineering
- Industry: Technology
- Company Size: 100,000+
- Website: microsoft.com

Please provide your assessment in the following JSON format with a qualification score between 0-100."#
                .to_string(),
            expected_output: Some(r#"{"qualification_score": 85}"#.to_string()),
        },
        EvaluationCase {
            test_name: "Lead Qualification - Low Value Prospect".to_string(),
            prompt_template: "Qualify lead for enterprise software sales".to_string(),
            test_input: r#"You are an expert Sales Development Representative (SDR) AI assistant. Analyze the following lead information and provide a qualification assessment.

Lead Information:
- Name: Jane Doe
- Email: jane@smallstartup.com
- Company: Small Startup
- Job Title: Intern
- Industry: Unknown
- Company Size: 1-10
- Website: N/A

Please provide your assessment in the following JSON format with a qualification score between 0-100."#
                .to_string(),
            expected_output: Some(r#"{"qualification_score": 25}"#.to_string()),
        },
        EvaluationCase {
            test_name: "Email Generation - Enterprise Prospect".to_string(),
            prompt_template: "Generate personalized email for enterprise prospect".to_string(),
            test_input: r#"Write a personalized email message for:
- Name: Sarah Johnson
- Company: Amazon
- Job Title: Director of Operations
- Industry: E-commerce

Keep it under 150 words, professional tone, focus on operational efficiency."#
                .to_string(),
            expected_output: Some("Hi Sarah".to_string()),
        },
        EvaluationCase {
            test_name: "LinkedIn Message Generation".to_string(),
            prompt_template: "Generate personalized LinkedIn message".to_string(),
            test_input: r#"Write a personalized LinkedIn message for:
- Name: Mike Chen
- Company: Google
- Job Title: Product Manager
- Industry: Technology

Keep it under 300 characters, mention their company and role."#
                .to_string(),
            expected_output: Some("Hi Mike".to_string()),
        },
        EvaluationCase {
            test_name: "Lead Scoring - Technology Company".to_string(),
            prompt_template: "Score lead based on criteria".to_string(),
            test_input: r#"Score this lead based on company size, job title authority, and industry fit:
- Name: David Wilson
- Company: Salesforce
- Job Title: CTO
- Industry: Software
- Company Size: 10,000+

Provide scores from 0-10 for each criteria and total weighted score."#
                .to_string(),
            expected_output: Some("total_score".to_string()),
        },
    ]
}

impl EvaluationService {
    pub fn new(pool: PgPool, grok: GrokClient) -> Self {
        Self { pool, grok }
    }

    /// Runs the given test cases through Grok, one row per case.
    ///
    /// A failing upstream call never aborts the run: the case is recorded
    /// with an ERROR output, score 0 and passed = false.
    pub async fn run(&self, test_cases: Vec<EvaluationCase>) -> Result<Vec<Evaluation>, AppError> {
        let mut results = Vec::with_capacity(test_cases.len());

        for case in test_cases {
            let started = Instant::now();

            let (actual_output, score, passed) =
                match self.grok.complete(&case.test_input, 1000, 0.7).await {
                    Ok(completion) => {
                        let score = case
                            .expected_output
                            .as_deref()
                            .map(|expected| similarity_score(expected, &completion.content));
                        let passed = score.map(|s| s >= PASS_THRESHOLD).unwrap_or(false);
                        (completion.content, score, passed)
                    }
                    Err(e) => {
                        tracing::error!("Evaluation '{}' failed: {}", case.test_name, e);
                        (format!("ERROR: {}", e), Some(0.0), false)
                    }
                };

            let execution_time_ms = started.elapsed().as_millis() as i64;

            let evaluation = sqlx::query_as::<_, Evaluation>(
                r#"
                INSERT INTO evaluations (
                    test_name, prompt_template, test_input, expected_output,
                    actual_output, score, passed, execution_time_ms
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(&case.test_name)
            .bind(&case.prompt_template)
            .bind(&case.test_input)
            .bind(&case.expected_output)
            .bind(&actual_output)
            .bind(score)
            .bind(passed)
            .bind(execution_time_ms)
            .fetch_one(&self.pool)
            .await
            .context("Failed to store evaluation result")?;

            tracing::info!(
                "Completed evaluation: {} - score: {:?} ({}ms)",
                evaluation.test_name,
                evaluation.score,
                execution_time_ms
            );
            results.push(evaluation);
        }

        Ok(results)
    }

    pub async fn run_defaults(&self) -> Result<Vec<Evaluation>, AppError> {
        self.run(default_cases()).await
    }

    pub async fn get_evaluations(
        &self,
        params: &EvaluationListParams,
    ) -> Result<Vec<Evaluation>, AppError> {
        let skip = params.skip.unwrap_or(0).max(0);
        let limit = params.limit.unwrap_or(100).clamp(1, 1000);
        let name_term = params.test_name.as_ref().map(|n| format!("%{}%", n));

        let evaluations = sqlx::query_as::<_, Evaluation>(
            r#"
            SELECT * FROM evaluations
            WHERE ($1::text IS NULL OR test_name ILIKE $1)
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(name_term)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(evaluations)
    }

    /// Aggregates counts, average score and average latency over the most
    /// recent `limit` records (all records when no limit given).
    pub async fn get_summary(&self, limit: Option<i64>) -> Result<EvaluationSummary, AppError> {
        let evaluations = sqlx::query_as::<_, Evaluation>(
            r#"
            SELECT * FROM evaluations
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        if evaluations.is_empty() {
            return Ok(EvaluationSummary::default());
        }

        let total_tests = evaluations.len() as i64;
        let passed_tests = evaluations.iter().filter(|e| e.passed).count() as i64;
        let failed_tests = total_tests - passed_tests;

        let scored: Vec<f64> = evaluations.iter().filter_map(|e| e.score).collect();
        let average_score = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<f64>() / scored.len() as f64)
        };

        let timed: Vec<i64> = evaluations
            .iter()
            .filter_map(|e| e.execution_time_ms)
            .collect();
        let average_execution_time_ms = if timed.is_empty() {
            None
        } else {
            Some(timed.iter().sum::<i64>() as f64 / timed.len() as f64)
        };

        Ok(EvaluationSummary {
            total_tests,
            passed_tests,
            failed_tests,
            average_score,
            average_execution_time_ms,
        })
    }

    pub async fn delete_evaluation(&self, evaluation_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM evaluations WHERE id = $1")
            .bind(evaluation_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(similarity_score("Hi Sarah", "hi sarah"), 1.0);
        assert_eq!(similarity_score("  Hi Sarah  ", "Hi Sarah"), 1.0);
    }

    #[test]
    fn empty_expected_scores_zero() {
        assert_eq!(similarity_score("", "anything"), 0.0);
        assert_eq!(similarity_score("   ", "anything"), 0.0);
    }

    #[test]
    fn partial_overlap_scores_between_zero_and_one() {
        let score = similarity_score("Hi Sarah", "Hi Sarah, great to connect with you!");
        assert!(score > 0.0 && score < 1.0);
        // Both expected words appear in the actual output
        assert!(score > 0.8);
    }

    #[test]
    fn disjoint_texts_score_low() {
        let score = similarity_score("alpha beta gamma", "delta epsilon zeta");
        // No word overlap, only the length-ratio component remains
        assert!(score < 0.25);
    }

    #[test]
    fn default_cases_cover_qualification_generation_and_scoring() {
        let cases = default_cases();
        assert_eq!(cases.len(), 5);
        assert!(cases.iter().all(|c| c.expected_output.is_some()));
        assert!(cases.iter().any(|c| c.test_name.contains("Qualification")));
        assert!(cases.iter().any(|c| c.test_name.contains("LinkedIn")));
        assert!(cases.iter().any(|c| c.test_name.contains("Scoring")));
    }
}
