use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Enums ============

/// Position of a lead in the sales funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "pipeline_stage", rename_all = "snake_case")]
pub enum PipelineStage {
    New,
    Qualified,
    Contacted,
    MeetingScheduled,
    ProposalSent,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl PipelineStage {
    /// All stages in funnel order, used for pipeline statistics.
    pub const ALL: [PipelineStage; 8] = [
        PipelineStage::New,
        PipelineStage::Qualified,
        PipelineStage::Contacted,
        PipelineStage::MeetingScheduled,
        PipelineStage::ProposalSent,
        PipelineStage::Negotiation,
        PipelineStage::ClosedWon,
        PipelineStage::ClosedLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::New => "new",
            PipelineStage::Qualified => "qualified",
            PipelineStage::Contacted => "contacted",
            PipelineStage::MeetingScheduled => "meeting_scheduled",
            PipelineStage::ProposalSent => "proposal_sent",
            PipelineStage::Negotiation => "negotiation",
            PipelineStage::ClosedWon => "closed_won",
            PipelineStage::ClosedLost => "closed_lost",
        }
    }

    /// Parses a stage name as returned by the AI qualification response.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(PipelineStage::New),
            "qualified" => Some(PipelineStage::Qualified),
            "contacted" => Some(PipelineStage::Contacted),
            "meeting_scheduled" => Some(PipelineStage::MeetingScheduled),
            "proposal_sent" => Some(PipelineStage::ProposalSent),
            "negotiation" => Some(PipelineStage::Negotiation),
            "closed_won" => Some(PipelineStage::ClosedWon),
            "closed_lost" => Some(PipelineStage::ClosedLost),
            _ => None,
        }
    }
}

/// Type of a recorded lead interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "interaction_type", rename_all = "snake_case")]
pub enum InteractionType {
    Email,
    Call,
    Meeting,
    Linkedin,
    Note,
}

// ============ Database Models ============

/// A sales prospect record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub job_title: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub company_website: Option<String>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,
    /// Qualification score on a 0-10 scale.
    pub lead_score: f64,
    pub pipeline_stage: PipelineStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A recorded touchpoint with a lead. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub interaction_type: InteractionType,
    pub subject: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An AI-generated outreach message stored against a lead.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub lead_id: Uuid,
    /// Free-form type: "email", "linkedin", "cold_call_script".
    pub message_type: String,
    pub subject: Option<String>,
    pub content: String,
    /// The prompt that produced this message.
    pub prompt_used: Option<String>,
    /// Raw upstream completion text, kept for auditing.
    pub raw_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A user-defined weighted scoring rule.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoringCriteria {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub weight: f64,
    /// Serialized key -> score mapping, stored as JSON text.
    pub criteria_rules: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write-once audit record of one AI evaluation test case.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub test_name: String,
    pub prompt_template: String,
    pub test_input: String,
    pub expected_output: Option<String>,
    pub actual_output: String,
    /// Similarity score in [0, 1], when an expected output was given.
    pub score: Option<f64>,
    pub passed: bool,
    pub execution_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// ============ Request / Response DTOs ============

#[derive(Debug, Clone, Deserialize)]
pub struct LeadCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub job_title: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub company_website: Option<String>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,
}

/// Distinguishes an omitted field (outer None) from an explicit JSON null
/// (Some(None)), so nullable columns can be cleared by an update.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update: only supplied fields are written. For nullable columns an
/// explicit `null` clears the value, while an omitted field keeps it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub job_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company_size: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub industry: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company_website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub lead_score: Option<f64>,
    pub pipeline_stage: Option<PipelineStage>,
}

/// Query parameters for lead listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub stage: Option<PipelineStage>,
    pub search: Option<String>,
}

/// Lead with its interactions and messages attached.
#[derive(Debug, Clone, Serialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    pub interactions: Vec<Interaction>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionCreate {
    pub interaction_type: InteractionType,
    pub subject: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageGenerateRequest {
    pub message_type: String,
    pub custom_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreRequest {
    /// Restrict scoring to these criteria; all active criteria when omitted.
    pub criteria_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub lead_id: Uuid,
    /// Weighted average over the scored criteria, 0-10 scale.
    pub total_score: f64,
    pub criteria_scores: std::collections::BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringCriteriaCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub criteria_rules: String,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriteriaListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationCase {
    pub test_name: String,
    pub prompt_template: String,
    pub test_input: String,
    pub expected_output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRunRequest {
    pub test_cases: Vec<EvaluationCase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub test_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationSummaryParams {
    pub limit: Option<i64>,
}

/// Aggregate statistics over stored evaluation records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationSummary {
    pub total_tests: i64,
    pub passed_tests: i64,
    pub failed_tests: i64,
    pub average_score: Option<f64>,
    pub average_execution_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<i64>,
}

/// One ranked hit from the cross-entity search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: Uuid,
    /// "lead", "interaction" or "message".
    #[serde(rename = "type")]
    pub result_type: String,
    pub title: String,
    pub content: String,
    pub score: f64,
}

/// General acknowledgement body for deletes and similar operations.
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub message: String,
    pub success: bool,
}

impl AckResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_update_distinguishes_null_from_omitted() {
        let omitted: LeadUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(omitted.notes, None);
        assert_eq!(omitted.phone, None);

        let payload = r#"{"notes": null, "phone": "+15550100"}"#;
        let update: LeadUpdate = serde_json::from_str(payload).unwrap();
        assert_eq!(update.notes, Some(None));
        assert_eq!(update.phone, Some(Some("+15550100".to_string())));
        // Untouched fields stay omitted
        assert_eq!(update.job_title, None);
        assert_eq!(update.first_name, None);
    }

    #[test]
    fn search_result_serializes_type_key() {
        let result = SearchResult {
            id: Uuid::new_v4(),
            result_type: "lead".to_string(),
            title: "John Smith".to_string(),
            content: "Acme Corp".to_string(),
            score: 1.0,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "lead");
        assert!(value.get("result_type").is_none());
    }
}
