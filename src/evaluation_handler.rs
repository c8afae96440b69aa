use crate::errors::AppError;
use crate::evaluation_service::EvaluationService;
use crate::handlers::AppState;
use crate::models::{
    AckResponse, Evaluation, EvaluationListParams, EvaluationRunRequest, EvaluationSummary,
    EvaluationSummaryParams,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

fn service(state: &AppState) -> EvaluationService {
    EvaluationService::new(state.db.clone(), state.grok.clone())
}

/// POST /api/evaluations/run
pub async fn run_evaluations(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluationRunRequest>,
) -> Result<Json<Vec<Evaluation>>, AppError> {
    if request.test_cases.is_empty() {
        return Err(AppError::BadRequest(
            "At least one test case required".to_string(),
        ));
    }
    let results = service(&state).run(request.test_cases).await?;
    Ok(Json(results))
}

/// POST /api/evaluations/run-defaults
pub async fn run_default_evaluations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Evaluation>>, AppError> {
    let results = service(&state).run_defaults().await?;
    Ok(Json(results))
}

/// GET /api/evaluations
pub async fn get_evaluations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvaluationListParams>,
) -> Result<Json<Vec<Evaluation>>, AppError> {
    let evaluations = service(&state).get_evaluations(&params).await?;
    Ok(Json(evaluations))
}

/// GET /api/evaluations/summary
pub async fn get_evaluation_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvaluationSummaryParams>,
) -> Result<Json<EvaluationSummary>, AppError> {
    let summary = service(&state).get_summary(params.limit).await?;
    Ok(Json(summary))
}

/// DELETE /api/evaluations/:id
pub async fn delete_evaluation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AckResponse>, AppError> {
    if !service(&state).delete_evaluation(id).await? {
        return Err(AppError::NotFound(format!(
            "Evaluation with id {} not found",
            id
        )));
    }
    Ok(Json(AckResponse::ok("Evaluation deleted successfully")))
}
