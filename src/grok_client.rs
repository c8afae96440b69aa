use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Lead, PipelineStage, ScoringCriteria};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Client for the Grok chat-completions API.
///
/// One attempt per call, bounded by the configured timeout. No retries,
/// no backoff, no circuit breaker: callers that can degrade gracefully
/// receive a sentinel result instead of an error.
#[derive(Clone)]
pub struct GrokClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Raw completion returned by the upstream API.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: Option<String>,
    pub usage: Option<Value>,
}

/// AI assessment of a lead's sales viability.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Qualification {
    /// 0-100 scale as produced by the model.
    pub qualification_score: f64,
    pub qualification_reasons: Vec<String>,
    pub recommended_stage: Option<PipelineStage>,
    pub next_actions: Vec<String>,
    pub pain_points: Vec<String>,
    /// True when the upstream call failed and this is the sentinel result.
    pub degraded: bool,
}

/// AI per-criterion scoring breakdown.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoreAssessment {
    /// Criterion name -> score on a 0-10 scale.
    pub criteria_scores: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
    /// True when the upstream call failed and no scores were produced.
    pub degraded: bool,
}

/// A generated outreach message plus the prompt that produced it.
#[derive(Debug, Clone)]
pub struct GeneratedMessage {
    pub content: String,
    pub prompt_used: String,
    pub raw_response: String,
}

impl GrokClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.grok_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Grok client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.grok_base_url.clone(),
            api_key: config.grok_api_key.clone(),
            model: config.grok_model.clone(),
        })
    }

    /// Sends a single chat-completion request and returns the raw content.
    pub async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Completion, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("Sending completion request to {}", url);

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Grok request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Grok returned {}: {}",
                status, error_text
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Grok response: {}", e))
        })?;

        let content = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::ExternalApiError(
                    "Grok response missing choices[0].message.content".to_string(),
                )
            })?
            .to_string();

        Ok(Completion {
            content,
            model: data
                .get("model")
                .and_then(|v| v.as_str())
                .map(ToString::to_string),
            usage: data.get("usage").cloned(),
        })
    }

    /// Qualifies a lead. Never fails: upstream errors yield the degraded
    /// sentinel result, unparseable responses yield the neutral fallback.
    pub async fn qualify_lead(&self, lead: &Lead) -> Qualification {
        let prompt = qualification_prompt(lead);

        let completion = match self.complete(&prompt, 500, 0.3).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Qualification call failed for lead {}: {}", lead.id, e);
                return Qualification {
                    qualification_score: 0.0,
                    qualification_reasons: vec![format!("Grok API unavailable: {}", e)],
                    recommended_stage: None,
                    next_actions: vec![],
                    pain_points: vec![],
                    degraded: true,
                };
            }
        };

        match extract_json(&completion.content) {
            Some(value) => parse_qualification(&value),
            None => {
                tracing::warn!(
                    "Qualification response for lead {} was not JSON, using fallback",
                    lead.id
                );
                Qualification {
                    qualification_score: 50.0,
                    qualification_reasons: vec!["Analysis pending".to_string()],
                    recommended_stage: Some(PipelineStage::New),
                    next_actions: vec!["Manual review required".to_string()],
                    pain_points: vec!["To be determined".to_string()],
                    degraded: false,
                }
            }
        }
    }

    /// Scores a lead against the provided criteria. Never fails: upstream
    /// errors yield an empty degraded assessment, unparseable responses
    /// assign the neutral 5.0 to every criterion.
    pub async fn score_lead(
        &self,
        lead: &Lead,
        criteria: &[ScoringCriteria],
    ) -> ScoreAssessment {
        let prompt = scoring_prompt(lead, criteria);

        let completion = match self.complete(&prompt, 600, 0.2).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Scoring call failed for lead {}: {}", lead.id, e);
                return ScoreAssessment {
                    criteria_scores: BTreeMap::new(),
                    recommendations: vec![format!("Grok API unavailable: {}", e)],
                    degraded: true,
                };
            }
        };

        match extract_json(&completion.content) {
            Some(value) => parse_score_assessment(&value),
            None => {
                tracing::warn!(
                    "Scoring response for lead {} was not JSON, using neutral scores",
                    lead.id
                );
                ScoreAssessment {
                    criteria_scores: criteria
                        .iter()
                        .map(|c| (c.name.clone(), 5.0))
                        .collect(),
                    recommendations: vec!["Manual review required".to_string()],
                    degraded: false,
                }
            }
        }
    }

    /// Generates a personalized outreach message. There is no sensible
    /// degraded message body, so upstream failures propagate.
    pub async fn generate_message(
        &self,
        lead: &Lead,
        message_type: &str,
        custom_instructions: Option<&str>,
    ) -> Result<GeneratedMessage, AppError> {
        let prompt = message_prompt(lead, message_type, custom_instructions);

        let completion = self.complete(&prompt, 800, 0.7).await?;

        Ok(GeneratedMessage {
            content: completion.content.trim().to_string(),
            prompt_used: prompt,
            raw_response: completion.content,
        })
    }
}

/// Builds the qualification prompt for a lead.
fn qualification_prompt(lead: &Lead) -> String {
    format!(
        r#"You are an expert Sales Development Representative (SDR) AI assistant. Analyze the following lead information and provide a qualification assessment.

Lead Information:
- Name: {} {}
- Email: {}
- Company: {}
- Job Title: {}
- Industry: {}
- Company Size: {}
- Website: {}

Please provide your assessment in the following JSON format:
{{
    "qualification_score": <number between 0-100>,
    "qualification_reasons": [
        "reason 1",
        "reason 2"
    ],
    "recommended_stage": "<new|qualified|contacted>",
    "next_actions": [
        "action 1",
        "action 2"
    ],
    "pain_points": [
        "potential pain point 1",
        "potential pain point 2"
    ]
}}

Focus on factors like company size, industry fit, job title relevance, and potential budget/decision-making authority."#,
        lead.first_name,
        lead.last_name,
        lead.email,
        lead.company_name,
        lead.job_title.as_deref().unwrap_or("N/A"),
        lead.industry.as_deref().unwrap_or("N/A"),
        lead.company_size.as_deref().unwrap_or("N/A"),
        lead.company_website.as_deref().unwrap_or("N/A"),
    )
}

/// Builds the scoring prompt embedding each criterion's name, weight and description.
fn scoring_prompt(lead: &Lead, criteria: &[ScoringCriteria]) -> String {
    let criteria_text = criteria
        .iter()
        .map(|c| {
            format!(
                "- {} (Weight: {}): {}",
                c.name,
                c.weight,
                c.description.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert Sales Development Representative (SDR) AI assistant. Score the following lead based on the provided criteria.

Lead Information:
- Name: {} {}
- Email: {}
- Company: {}
- Job Title: {}
- Industry: {}
- Company Size: {}
- Website: {}

Scoring Criteria:
{}

Please provide your assessment in the following JSON format:
{{
    "total_score": <calculated weighted total score>,
    "criteria_scores": {{
        "criteria_name_1": <score for this criteria>,
        "criteria_name_2": <score for this criteria>
    }},
    "recommendations": [
        "recommendation 1",
        "recommendation 2"
    ]
}}

Score each criteria from 0-10, then calculate the weighted total score."#,
        lead.first_name,
        lead.last_name,
        lead.email,
        lead.company_name,
        lead.job_title.as_deref().unwrap_or("N/A"),
        lead.industry.as_deref().unwrap_or("N/A"),
        lead.company_size.as_deref().unwrap_or("N/A"),
        lead.company_website.as_deref().unwrap_or("N/A"),
        criteria_text,
    )
}

/// Builds the outreach message prompt.
fn message_prompt(lead: &Lead, message_type: &str, custom_instructions: Option<&str>) -> String {
    let mut prompt = format!(
        r#"You are an expert Sales Development Representative (SDR) writing personalized outreach messages.

Lead Information:
- Name: {} {}
- Company: {}
- Job Title: {}
- Industry: {}
- Company Size: {}
- Website: {}

Message Type: {}

Write a personalized {} message that:
1. Addresses the lead by name
2. Shows you've researched their company/role
3. Identifies a relevant pain point or opportunity
4. Offers clear value proposition
5. Has a specific call-to-action
6. Maintains a professional but friendly tone
7. Keeps it concise (under 150 words for email, under 300 characters for LinkedIn)"#,
        lead.first_name,
        lead.last_name,
        lead.company_name,
        lead.job_title.as_deref().unwrap_or("N/A"),
        lead.industry.as_deref().unwrap_or("N/A"),
        lead.company_size.as_deref().unwrap_or("N/A"),
        lead.company_website.as_deref().unwrap_or("N/A"),
        message_type,
        message_type,
    );

    if let Some(instructions) = custom_instructions {
        prompt.push_str(&format!("\n\nAdditional Instructions: {}", instructions));
    }

    prompt.push_str(
        "\n\nGenerate ONLY the message content, no subject line or signatures unless specifically requested.",
    );

    prompt
}

/// Extracts a JSON object from a completion.
///
/// Tries, in order: the whole text as JSON, the contents of a markdown code
/// fence, and the substring between the first `{` and the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    // Markdown fence: ```json ... ``` or ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(after[..end].trim()) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }

    // Last resort: the outermost brace-delimited slice.
    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if last <= first {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[first..=last])
        .ok()
        .filter(Value::is_object)
}

fn parse_qualification(value: &Value) -> Qualification {
    Qualification {
        qualification_score: number_field(value, "qualification_score").unwrap_or(50.0),
        qualification_reasons: string_list(value, "qualification_reasons"),
        recommended_stage: value
            .get("recommended_stage")
            .and_then(|v| v.as_str())
            .and_then(PipelineStage::parse),
        next_actions: string_list(value, "next_actions"),
        pain_points: string_list(value, "pain_points"),
        degraded: false,
    }
}

fn parse_score_assessment(value: &Value) -> ScoreAssessment {
    let criteria_scores = value
        .get("criteria_scores")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(name, score)| score.as_f64().map(|s| (name.clone(), s)))
                .collect()
        })
        .unwrap_or_default();

    ScoreAssessment {
        criteria_scores,
        recommendations: string_list(value, "recommendations"),
        degraded: false,
    }
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(|v| v.as_f64())
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            first_name: "Sarah".to_string(),
            last_name: "Johnson".to_string(),
            email: "sarah@amazon.com".to_string(),
            phone: None,
            company_name: "Amazon".to_string(),
            job_title: Some("Director of Operations".to_string()),
            company_size: Some("10,000+".to_string()),
            industry: Some("E-commerce".to_string()),
            company_website: None,
            linkedin_url: None,
            notes: None,
            lead_score: 0.0,
            pipeline_stage: PipelineStage::New,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn qualification_prompt_embeds_lead_fields() {
        let prompt = qualification_prompt(&test_lead());
        assert!(prompt.contains("Sarah Johnson"));
        assert!(prompt.contains("Amazon"));
        assert!(prompt.contains("Director of Operations"));
        assert!(prompt.contains("qualification_score"));
        // Missing optional fields render as N/A
        assert!(prompt.contains("Website: N/A"));
    }

    #[test]
    fn message_prompt_appends_custom_instructions() {
        let prompt = message_prompt(&test_lead(), "email", Some("mention the Q3 webinar"));
        assert!(prompt.contains("Message Type: email"));
        assert!(prompt.contains("Additional Instructions: mention the Q3 webinar"));
    }

    #[test]
    fn scoring_prompt_lists_criteria_with_weights() {
        let criteria = vec![ScoringCriteria {
            id: Uuid::new_v4(),
            name: "Company Size".to_string(),
            description: Some("Budget potential".to_string()),
            weight: 3.0,
            criteria_rules: "{}".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];
        let prompt = scoring_prompt(&test_lead(), &criteria);
        assert!(prompt.contains("- Company Size (Weight: 3): Budget potential"));
    }

    #[test]
    fn extract_json_strict() {
        let value = extract_json(r#"{"qualification_score": 85}"#).unwrap();
        assert_eq!(value["qualification_score"], 85);
    }

    #[test]
    fn extract_json_from_fence() {
        let text = "Here is my assessment:\n```json\n{\"qualification_score\": 72}\n```\nLet me know.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["qualification_score"], 72);
    }

    #[test]
    fn extract_json_from_surrounding_prose() {
        let text = "Sure! {\"total_score\": 7.5, \"criteria_scores\": {}} Hope that helps.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["total_score"], 7.5);
    }

    #[test]
    fn extract_json_rejects_plain_text() {
        assert!(extract_json("This lead looks promising.").is_none());
        assert!(extract_json("").is_none());
        assert!(extract_json("[1, 2, 3]").is_none());
    }

    #[test]
    fn parse_qualification_reads_stage_and_lists() {
        let value = serde_json::json!({
            "qualification_score": 85,
            "qualification_reasons": ["VP title", "large company"],
            "recommended_stage": "qualified",
            "next_actions": ["book a call"],
            "pain_points": ["scaling"]
        });
        let q = parse_qualification(&value);
        assert_eq!(q.qualification_score, 85.0);
        assert_eq!(q.recommended_stage, Some(PipelineStage::Qualified));
        assert_eq!(q.qualification_reasons.len(), 2);
        assert!(!q.degraded);
    }

    #[test]
    fn parse_qualification_ignores_unknown_stage() {
        let value = serde_json::json!({
            "qualification_score": 40,
            "recommended_stage": "warm"
        });
        let q = parse_qualification(&value);
        assert_eq!(q.recommended_stage, None);
    }
}
