use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{AckResponse, CriteriaListParams, ScoringCriteria, ScoringCriteriaCreate};
use crate::scoring::default_criteria;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/scoring/criteria
pub async fn create_criteria(
    State(state): State<Arc<AppState>>,
    Json(data): Json<ScoringCriteriaCreate>,
) -> Result<(StatusCode, Json<ScoringCriteria>), AppError> {
    if data.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Criteria name cannot be empty".to_string(),
        ));
    }
    if data.weight < 0.0 {
        return Err(AppError::BadRequest(
            "Criteria weight cannot be negative".to_string(),
        ));
    }

    let criteria = sqlx::query_as::<_, ScoringCriteria>(
        r#"
        INSERT INTO scoring_criteria (name, description, weight, criteria_rules)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.weight)
    .bind(&data.criteria_rules)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Created scoring criteria: {}", criteria.name);
    Ok((StatusCode::CREATED, Json(criteria)))
}

/// GET /api/scoring/criteria
pub async fn get_criteria(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CriteriaListParams>,
) -> Result<Json<Vec<ScoringCriteria>>, AppError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let active_only = params.active_only.unwrap_or(true);

    let criteria = sqlx::query_as::<_, ScoringCriteria>(
        r#"
        SELECT * FROM scoring_criteria
        WHERE (NOT $1 OR is_active = TRUE)
        ORDER BY weight DESC, created_at ASC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(active_only)
    .bind(skip)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(criteria))
}

/// GET /api/scoring/criteria/:id
pub async fn get_criteria_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoringCriteria>, AppError> {
    let criteria =
        sqlx::query_as::<_, ScoringCriteria>("SELECT * FROM scoring_criteria WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Scoring criteria with id {} not found", id))
            })?;

    Ok(Json(criteria))
}

/// PUT /api/scoring/criteria/:id
pub async fn update_criteria(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(data): Json<ScoringCriteriaCreate>,
) -> Result<Json<ScoringCriteria>, AppError> {
    if data.weight < 0.0 {
        return Err(AppError::BadRequest(
            "Criteria weight cannot be negative".to_string(),
        ));
    }

    let criteria = sqlx::query_as::<_, ScoringCriteria>(
        r#"
        UPDATE scoring_criteria
        SET name = $1, description = $2, weight = $3, criteria_rules = $4, updated_at = now()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.weight)
    .bind(&data.criteria_rules)
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Scoring criteria with id {} not found", id)))?;

    Ok(Json(criteria))
}

/// DELETE /api/scoring/criteria/:id
///
/// Soft delete: the criteria row stays for historical scores, it just stops
/// participating in new scoring runs.
pub async fn deactivate_criteria(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AckResponse>, AppError> {
    let result =
        sqlx::query("UPDATE scoring_criteria SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Scoring criteria with id {} not found",
            id
        )));
    }

    Ok(Json(AckResponse::ok(
        "Scoring criteria deactivated successfully",
    )))
}

/// POST /api/scoring/criteria/defaults
///
/// Seeds the four built-in criteria, skipping names that already exist.
pub async fn create_default_criteria(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut created: Vec<ScoringCriteria> = Vec::new();

    for (name, description, weight, rules) in default_criteria() {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM scoring_criteria WHERE name = $1")
                .bind(name)
                .fetch_optional(&state.db)
                .await?;

        if existing.is_some() {
            continue;
        }

        let criteria = sqlx::query_as::<_, ScoringCriteria>(
            r#"
            INSERT INTO scoring_criteria (name, description, weight, criteria_rules)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(weight)
        .bind(&rules)
        .fetch_one(&state.db)
        .await?;

        created.push(criteria);
    }

    tracing::info!("Created {} default scoring criteria", created.len());
    Ok(Json(json!({
        "message": format!("Created {} default scoring criteria", created.len()),
        "criteria": created,
    })))
}
