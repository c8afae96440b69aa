use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{SearchParams, SearchRequest, SearchResult};
use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

/// GET /api/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    if params.query.trim().is_empty() {
        return Err(AppError::BadRequest("Search query cannot be empty".to_string()));
    }
    let results = state
        .lead_service()
        .search(&params.query, params.limit.unwrap_or(10))
        .await?;
    Ok(Json(results))
}

/// POST /api/search
pub async fn search_advanced(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Search query cannot be empty".to_string()));
    }
    let results = state
        .lead_service()
        .search(&request.query, request.limit.unwrap_or(10))
        .await?;
    Ok(Json(results))
}
