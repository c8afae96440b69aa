use crate::errors::{AppError, ResultExt};
use crate::grok_client::{GrokClient, Qualification};
use crate::models::*;
use crate::scoring::{clamp_score, weighted_average};
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

/// Service for lead management operations.
///
/// Owns a pool handle and a Grok client; constructed per request from the
/// shared application state.
pub struct LeadService {
    pool: PgPool,
    grok: GrokClient,
}

/// Validates an email address.
///
/// Basic shape checks plus a simplified RFC 5322 regex. Uniqueness is
/// deliberately not enforced, duplicate lead emails are allowed.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified email regex
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap();

    email_regex.is_match(email)
}

/// Truncates search snippets to keep result payloads small.
fn snippet(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

impl LeadService {
    pub fn new(pool: PgPool, grok: GrokClient) -> Self {
        Self { pool, grok }
    }

    pub async fn create_lead(&self, data: LeadCreate) -> Result<Lead, AppError> {
        if !is_valid_email(&data.email) {
            return Err(AppError::BadRequest(format!(
                "Invalid email address: {}",
                data.email
            )));
        }

        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                first_name, last_name, email, phone, company_name, job_title,
                company_size, industry, company_website, linkedin_url, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.company_name)
        .bind(&data.job_title)
        .bind(&data.company_size)
        .bind(&data.industry)
        .bind(&data.company_website)
        .bind(&data.linkedin_url)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create lead")?;

        tracing::info!("Created lead: {} - {}", lead.id, lead.full_name());
        Ok(lead)
    }

    pub async fn get_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    async fn require_lead(&self, lead_id: Uuid) -> Result<Lead, AppError> {
        self.get_lead(lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", lead_id)))
    }

    /// Lists leads with pagination, optional stage filter and optional
    /// case-insensitive substring search over name, email and company.
    pub async fn get_leads(&self, params: &LeadListParams) -> Result<Vec<Lead>, AppError> {
        let skip = params.skip.unwrap_or(0).max(0);
        let limit = params.limit.unwrap_or(100).clamp(1, 1000);
        let search_term = params.search.as_ref().map(|s| format!("%{}%", s));

        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE ($1::pipeline_stage IS NULL OR pipeline_stage = $1)
              AND ($2::text IS NULL
                   OR first_name ILIKE $2
                   OR last_name ILIKE $2
                   OR email ILIKE $2
                   OR company_name ILIKE $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(params.stage)
        .bind(search_term)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }

    pub async fn update_lead(
        &self,
        lead_id: Uuid,
        data: LeadUpdate,
    ) -> Result<Option<Lead>, AppError> {
        let Some(lead) = self.get_lead(lead_id).await? else {
            return Ok(None);
        };

        if let Some(ref email) = data.email {
            if !is_valid_email(email) {
                return Err(AppError::BadRequest(format!(
                    "Invalid email address: {}",
                    email
                )));
            }
        }

        // Last-write-wins: apply supplied fields over the current row. For
        // nullable columns an explicit null in the payload clears the value.
        let updated = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET
                first_name = $1, last_name = $2, email = $3, phone = $4,
                company_name = $5, job_title = $6, company_size = $7,
                industry = $8, company_website = $9, linkedin_url = $10,
                notes = $11, lead_score = $12, pipeline_stage = $13,
                updated_at = now()
            WHERE id = $14
            RETURNING *
            "#,
        )
        .bind(data.first_name.unwrap_or(lead.first_name))
        .bind(data.last_name.unwrap_or(lead.last_name))
        .bind(data.email.unwrap_or(lead.email))
        .bind(data.phone.unwrap_or(lead.phone))
        .bind(data.company_name.unwrap_or(lead.company_name))
        .bind(data.job_title.unwrap_or(lead.job_title))
        .bind(data.company_size.unwrap_or(lead.company_size))
        .bind(data.industry.unwrap_or(lead.industry))
        .bind(data.company_website.unwrap_or(lead.company_website))
        .bind(data.linkedin_url.unwrap_or(lead.linkedin_url))
        .bind(data.notes.unwrap_or(lead.notes))
        .bind(data.lead_score.unwrap_or(lead.lead_score))
        .bind(data.pipeline_stage.unwrap_or(lead.pipeline_stage))
        .bind(lead_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update lead")?;

        tracing::info!("Updated lead: {} - {}", updated.id, updated.full_name());
        Ok(Some(updated))
    }

    /// Deletes a lead; interactions and messages go with it (FK cascade).
    pub async fn delete_lead(&self, lead_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(lead_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        tracing::info!("Deleted lead: {}", lead_id);
        Ok(true)
    }

    pub async fn add_interaction(
        &self,
        lead_id: Uuid,
        data: InteractionCreate,
    ) -> Result<Interaction, AppError> {
        self.require_lead(lead_id).await?;

        let interaction = sqlx::query_as::<_, Interaction>(
            r#"
            INSERT INTO interactions (lead_id, interaction_type, subject, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(data.interaction_type)
        .bind(&data.subject)
        .bind(&data.content)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add interaction")?;

        tracing::info!("Added interaction for lead: {}", lead_id);
        Ok(interaction)
    }

    pub async fn get_lead_interactions(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<Interaction>, AppError> {
        let interactions = sqlx::query_as::<_, Interaction>(
            "SELECT * FROM interactions WHERE lead_id = $1 ORDER BY created_at DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(interactions)
    }

    pub async fn get_lead_messages(&self, lead_id: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE lead_id = $1 ORDER BY created_at DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Qualifies a lead via Grok.
    ///
    /// Persists the clamped score (0-10 scale) and records the recommended
    /// stage as a note; `pipeline_stage` itself is never auto-advanced.
    /// Degraded results are returned to the caller but nothing is persisted.
    pub async fn qualify_lead(&self, lead_id: Uuid) -> Result<Qualification, AppError> {
        let lead = self.require_lead(lead_id).await?;

        let qualification = self.grok.qualify_lead(&lead).await;

        if qualification.degraded {
            tracing::warn!(
                "Qualification for lead {} degraded, skipping persistence",
                lead_id
            );
            return Ok(qualification);
        }

        let new_score = clamp_score(qualification.qualification_score / 10.0);

        let notes = match qualification.recommended_stage {
            Some(stage) => {
                let suggestion = format!("AI recommended stage: {}", stage.as_str());
                match lead.notes {
                    Some(ref existing) if !existing.trim().is_empty() => {
                        Some(format!("{}\n{}", existing, suggestion))
                    }
                    _ => Some(suggestion),
                }
            }
            None => lead.notes.clone(),
        };

        sqlx::query("UPDATE leads SET lead_score = $1, notes = $2, updated_at = now() WHERE id = $3")
            .bind(new_score)
            .bind(&notes)
            .bind(lead_id)
            .execute(&self.pool)
            .await
            .context("Failed to persist qualification")?;

        tracing::info!(
            "Qualified lead {}: score {:.1}/10",
            lead_id,
            new_score
        );
        Ok(qualification)
    }

    /// Scores a lead against active criteria and persists the weighted average.
    ///
    /// The total is computed server-side from the per-criterion scores and
    /// the stored weights; the model's own total is ignored.
    pub async fn score_lead(
        &self,
        lead_id: Uuid,
        criteria_ids: Option<Vec<Uuid>>,
    ) -> Result<ScoreResponse, AppError> {
        let lead = self.require_lead(lead_id).await?;

        let criteria = match criteria_ids {
            Some(ids) => {
                sqlx::query_as::<_, ScoringCriteria>(
                    "SELECT * FROM scoring_criteria WHERE is_active = TRUE AND id = ANY($1)",
                )
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ScoringCriteria>(
                    "SELECT * FROM scoring_criteria WHERE is_active = TRUE",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        if criteria.is_empty() {
            return Err(AppError::BadRequest(
                "No active scoring criteria found".to_string(),
            ));
        }

        let assessment = self.grok.score_lead(&lead, &criteria).await;

        if assessment.degraded {
            return Err(AppError::ExternalApiError(
                "Scoring unavailable: upstream AI call failed".to_string(),
            ));
        }

        let pairs: Vec<(f64, f64)> = criteria
            .iter()
            .filter_map(|c| {
                assessment
                    .criteria_scores
                    .get(&c.name)
                    .map(|score| (c.weight, *score))
            })
            .collect();

        if pairs.is_empty() {
            return Err(AppError::ExternalApiError(
                "Scoring response contained no usable criteria scores".to_string(),
            ));
        }

        let total_score = clamp_score(weighted_average(&pairs));

        sqlx::query("UPDATE leads SET lead_score = $1, updated_at = now() WHERE id = $2")
            .bind(total_score)
            .bind(lead_id)
            .execute(&self.pool)
            .await
            .context("Failed to persist lead score")?;

        tracing::info!("Scored lead {}: {:.1}/10", lead_id, total_score);

        Ok(ScoreResponse {
            lead_id,
            total_score,
            criteria_scores: assessment.criteria_scores,
            recommendations: assessment.recommendations,
        })
    }

    /// Generates a personalized message via Grok and stores it against the lead.
    pub async fn generate_message(
        &self,
        lead_id: Uuid,
        request: MessageGenerateRequest,
    ) -> Result<Message, AppError> {
        let lead = self.require_lead(lead_id).await?;

        let generated = self
            .grok
            .generate_message(
                &lead,
                &request.message_type,
                request.custom_instructions.as_deref(),
            )
            .await?;

        // If this insert fails the generated content is lost; acceptable,
        // the caller simply retries the generation.
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (lead_id, message_type, content, prompt_used, raw_response)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(&request.message_type)
        .bind(&generated.content)
        .bind(&generated.prompt_used)
        .bind(&generated.raw_response)
        .fetch_one(&self.pool)
        .await
        .context("Failed to store generated message")?;

        tracing::info!(
            "Generated {} message for lead: {}",
            request.message_type,
            lead_id
        );
        Ok(message)
    }

    /// Group-counts leads by pipeline stage. Every stage is present in the
    /// output, zero counts included, so the counts always sum to the total.
    pub async fn get_pipeline_stats(&self) -> Result<serde_json::Value, AppError> {
        let rows = sqlx::query_as::<_, (PipelineStage, i64)>(
            "SELECT pipeline_stage, COUNT(*) FROM leads GROUP BY pipeline_stage",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = serde_json::Map::new();
        for stage in PipelineStage::ALL {
            stats.insert(stage.as_str().to_string(), serde_json::json!(0));
        }
        for (stage, count) in rows {
            stats.insert(stage.as_str().to_string(), serde_json::json!(count));
        }

        Ok(serde_json::Value::Object(stats))
    }

    /// Ranked substring search across leads, interactions and messages.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<SearchResult>, AppError> {
        let limit = limit.clamp(1, 100);
        let term = format!("%{}%", query);
        let mut results: Vec<SearchResult> = Vec::new();

        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE first_name ILIKE $1
               OR last_name ILIKE $1
               OR company_name ILIKE $1
               OR email ILIKE $1
               OR job_title ILIKE $1
               OR industry ILIKE $1
            LIMIT $2
            "#,
        )
        .bind(&term)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        for lead in leads {
            results.push(SearchResult {
                id: lead.id,
                result_type: "lead".to_string(),
                title: format!("{} - {}", lead.full_name(), lead.company_name),
                content: format!(
                    "{} at {}",
                    lead.job_title.as_deref().unwrap_or("Unknown role"),
                    lead.company_name
                ),
                score: 1.0,
            });
        }

        let interactions = sqlx::query_as::<_, Interaction>(
            "SELECT * FROM interactions WHERE subject ILIKE $1 OR content ILIKE $1 LIMIT $2",
        )
        .bind(&term)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        for interaction in interactions {
            let lead = self.get_lead(interaction.lead_id).await?;
            results.push(SearchResult {
                id: interaction.id,
                result_type: "interaction".to_string(),
                title: format!(
                    "Interaction with {}",
                    lead.map(|l| l.full_name())
                        .unwrap_or_else(|| "Unknown".to_string())
                ),
                content: snippet(&interaction.content, 200),
                score: 0.8,
            });
        }

        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE subject ILIKE $1 OR content ILIKE $1 LIMIT $2",
        )
        .bind(&term)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        for message in messages {
            let lead = self.get_lead(message.lead_id).await?;
            results.push(SearchResult {
                id: message.id,
                result_type: "message".to_string(),
                title: format!(
                    "Message to {}",
                    lead.map(|l| l.full_name())
                        .unwrap_or_else(|| "Unknown".to_string())
                ),
                content: snippet(&message.content, 200),
                score: 0.6,
            });
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit as usize);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails_accepted() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user+tag@subdomain.example.co.uk"));
        assert!(is_valid_email("valid_email-2023@company.org"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn malformed_emails_rejected() {
        assert!(!is_valid_email("not_an_email"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn snippet_truncates_long_content() {
        let long = "x".repeat(250);
        let cut = snippet(&long, 200);
        assert_eq!(cut.chars().count(), 203);
        assert!(cut.ends_with("..."));

        assert_eq!(snippet("short", 200), "short");
    }
}
