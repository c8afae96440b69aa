use crate::config::Config;
use crate::errors::AppError;
use crate::grok_client::{GrokClient, Qualification};
use crate::lead_service::LeadService;
use crate::models::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Client for the Grok completions API.
    pub grok: GrokClient,
}

impl AppState {
    pub fn lead_service(&self) -> LeadService {
        LeadService::new(self.db.clone(), self.grok.clone())
    }
}

/// Root endpoint with API information.
pub async fn root() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Grok-powered SDR System API",
            "version": "0.1.0",
            "health": "/health"
        })),
    )
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "sdr-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(data): Json<LeadCreate>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    let lead = state.lead_service().create_lead(data).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// GET /api/leads
pub async fn get_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<Vec<Lead>>, AppError> {
    let leads = state.lead_service().get_leads(&params).await?;
    Ok(Json(leads))
}

/// GET /api/leads/:id
///
/// Returns the lead with its interactions and messages attached.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeadDetail>, AppError> {
    let service = state.lead_service();
    let lead = service
        .get_lead(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))?;

    let interactions = service.get_lead_interactions(id).await?;
    let messages = service.get_lead_messages(id).await?;

    Ok(Json(LeadDetail {
        lead,
        interactions,
        messages,
    }))
}

/// PUT /api/leads/:id
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(data): Json<LeadUpdate>,
) -> Result<Json<Lead>, AppError> {
    let updated = state
        .lead_service()
        .update_lead(id, data)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))?;
    Ok(Json(updated))
}

/// DELETE /api/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AckResponse>, AppError> {
    if !state.lead_service().delete_lead(id).await? {
        return Err(AppError::NotFound(format!("Lead with id {} not found", id)));
    }
    Ok(Json(AckResponse::ok("Lead deleted successfully")))
}

/// POST /api/leads/:id/qualify
pub async fn qualify_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Qualification>, AppError> {
    let qualification = state.lead_service().qualify_lead(id).await?;
    Ok(Json(qualification))
}

/// POST /api/leads/:id/score
pub async fn score_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let response = state
        .lead_service()
        .score_lead(id, request.criteria_ids)
        .await?;
    Ok(Json(response))
}

/// POST /api/leads/:id/interactions
pub async fn add_interaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(data): Json<InteractionCreate>,
) -> Result<(StatusCode, Json<Interaction>), AppError> {
    let interaction = state.lead_service().add_interaction(id, data).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

/// GET /api/leads/:id/interactions
pub async fn get_lead_interactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Interaction>>, AppError> {
    let service = state.lead_service();
    if service.get_lead(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Lead with id {} not found", id)));
    }
    let interactions = service.get_lead_interactions(id).await?;
    Ok(Json(interactions))
}

/// POST /api/leads/:id/messages/generate
pub async fn generate_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageGenerateRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = state.lead_service().generate_message(id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/leads/:id/messages
pub async fn get_lead_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, AppError> {
    let service = state.lead_service();
    if service.get_lead(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Lead with id {} not found", id)));
    }
    let messages = service.get_lead_messages(id).await?;
    Ok(Json(messages))
}

/// GET /api/leads/stats/pipeline
pub async fn get_pipeline_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let stats = state.lead_service().get_pipeline_stats().await?;
    Ok(Json(stats))
}
