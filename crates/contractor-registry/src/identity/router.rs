use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Alias, AliasSubmission, Decision, DecisionRequest, EmployerId, Reviewer, ReviewerRole,
};
use super::duplicates::DuplicateCluster;
use super::impact::ImpactReport;
use super::queue::PromotionCandidate;
use super::repository::IdentityRepository;
use super::service::EmployerIdentityService;
use crate::error::AppError;

/// Header carrying the authenticated reviewer id, set by the upstream gateway.
pub const REVIEWER_ID_HEADER: &str = "x-reviewer-id";
/// Header carrying the reviewer role, set by the upstream gateway.
pub const REVIEWER_ROLE_HEADER: &str = "x-reviewer-role";

/// Router builder exposing the identity review endpoints.
pub fn identity_router<R>(service: Arc<EmployerIdentityService<R>>) -> Router
where
    R: IdentityRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/employers/:employer_id/aliases",
            post(record_alias_handler::<R>),
        )
        .route("/api/v1/decisions", post(record_decision_handler::<R>))
        .route(
            "/api/v1/aliases/promotion-queue",
            get(promotion_queue_handler::<R>),
        )
        .route(
            "/api/v1/employers/duplicates/scan",
            post(duplicate_scan_handler::<R>),
        )
        .route(
            "/api/v1/employers/merge-impact",
            post(merge_impact_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Serialize)]
pub struct PromotionQueueResponse {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<PromotionCandidate>,
}

#[derive(Debug, Serialize)]
pub struct DuplicateScanResponse {
    pub reviewer: String,
    pub count: usize,
    pub clusters: Vec<DuplicateCluster>,
}

#[derive(Debug, Deserialize)]
pub struct MergeImpactRequest {
    pub employer_ids: Vec<EmployerId>,
}

/// Reviewer resolved from gateway headers. Missing or unknown roles fall back to
/// the least privileged role.
pub fn reviewer_from_headers(headers: &HeaderMap) -> Reviewer {
    let id = headers
        .get(REVIEWER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("anonymous");
    let role = headers
        .get(REVIEWER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(ReviewerRole::parse)
        .unwrap_or(ReviewerRole::Viewer);
    Reviewer::new(id, role)
}

pub(crate) async fn record_alias_handler<R>(
    State(service): State<Arc<EmployerIdentityService<R>>>,
    Path(employer_id): Path<String>,
    Json(submission): Json<AliasSubmission>,
) -> Result<Json<Alias>, AppError>
where
    R: IdentityRepository + 'static,
{
    let alias = service.record_alias(EmployerId(employer_id), submission)?;
    Ok(Json(alias))
}

pub(crate) async fn record_decision_handler<R>(
    State(service): State<Arc<EmployerIdentityService<R>>>,
    Json(request): Json<DecisionRequest>,
) -> Result<(StatusCode, Json<Decision>), AppError>
where
    R: IdentityRepository + 'static,
{
    let decision = service.record_decision(request)?;
    Ok((StatusCode::CREATED, Json(decision)))
}

pub(crate) async fn promotion_queue_handler<R>(
    State(service): State<Arc<EmployerIdentityService<R>>>,
) -> Result<Json<PromotionQueueResponse>, AppError>
where
    R: IdentityRepository + 'static,
{
    let generated_at = Utc::now();
    let items = service.promotion_queue_at(generated_at)?;
    Ok(Json(PromotionQueueResponse {
        generated_at,
        count: items.len(),
        items,
    }))
}

pub(crate) async fn duplicate_scan_handler<R>(
    State(service): State<Arc<EmployerIdentityService<R>>>,
    headers: HeaderMap,
) -> Result<Json<DuplicateScanResponse>, AppError>
where
    R: IdentityRepository + 'static,
{
    let reviewer = reviewer_from_headers(&headers);
    let reviewer_id = reviewer.id.clone();
    // Dropping the request abandons the join handle; the scan has nothing to roll back.
    let clusters =
        tokio::task::spawn_blocking(move || service.scan_duplicates(&reviewer)).await??;

    Ok(Json(DuplicateScanResponse {
        reviewer: reviewer_id,
        count: clusters.len(),
        clusters,
    }))
}

pub(crate) async fn merge_impact_handler<R>(
    State(service): State<Arc<EmployerIdentityService<R>>>,
    Json(request): Json<MergeImpactRequest>,
) -> Result<Json<ImpactReport>, AppError>
where
    R: IdentityRepository + 'static,
{
    let report = service.merge_impact(&request.employer_ids)?;
    Ok(Json(report))
}
