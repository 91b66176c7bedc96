use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::directory::AcademicDirectory;
use super::domain::RecommendationRequest;
use super::service::{RecommendationError, RecommendationService};

/// Router builder exposing recommendation, profile, and catalog endpoints.
pub fn recommendation_router<D>(service: Arc<RecommendationService<D>>) -> Router
where
    D: AcademicDirectory + 'static,
{
    Router::new()
        .route("/api/v1/recommendations", post(recommend_handler::<D>))
        .route("/api/v1/students/:student_id", get(profile_handler::<D>))
        .route("/api/v1/catalog", get(catalog_handler::<D>))
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CatalogQuery {
    pub term: String,
    #[serde(default)]
    pub curriculum_version: u32,
}

pub(crate) async fn recommend_handler<D>(
    State(service): State<Arc<RecommendationService<D>>>,
    axum::Json(request): axum::Json<RecommendationRequest>,
) -> Response
where
    D: AcademicDirectory + 'static,
{
    match service.generate(request).await {
        Ok(set) => (StatusCode::OK, axum::Json(set)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn profile_handler<D>(
    State(service): State<Arc<RecommendationService<D>>>,
    Path(student_id): Path<String>,
) -> Response
where
    D: AcademicDirectory + 'static,
{
    match service.profile(&student_id).await {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn catalog_handler<D>(
    State(service): State<Arc<RecommendationService<D>>>,
    Query(query): Query<CatalogQuery>,
) -> Response
where
    D: AcademicDirectory + 'static,
{
    match service.catalog(&query.term, query.curriculum_version).await {
        Ok(catalog) => (StatusCode::OK, axum::Json(catalog)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: RecommendationError) -> Response {
    let status = match &error {
        RecommendationError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        other if other.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    let detail = std::error::Error::source(&error).map(ToString::to_string);
    let payload = json!({
        "error": error.to_string(),
        "detail": detail,
    });
    (status, axum::Json(payload)).into_response()
}
