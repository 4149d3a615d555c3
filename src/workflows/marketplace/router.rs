use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{BidId, BidRequest, JobDraft, JobId, WorkerId, WorkerProfile};
use super::errors::MarketplaceError;
use super::notify::Notifier;
use super::risk::DelayRiskFeatures;
use super::service::MarketplaceService;
use super::store::{MarketplaceStore, WorkerDirectory};

/// Caller identity as resolved by the upstream gateway. The core trusts
/// this resolution and performs no credential checks of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Worker,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Worker => "worker",
            Role::Admin => "admin",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buyer" => Some(Role::Buyer),
            "worker" => Some(Role::Worker),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

fn context(headers: &HeaderMap) -> Result<RequestContext, MarketplaceError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MarketplaceError::Forbidden("missing resolved identity".to_string()))?;
    let role = headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(|| MarketplaceError::Forbidden("missing resolved role".to_string()))?;

    Ok(RequestContext {
        user_id: user_id.to_string(),
        role,
    })
}

fn require_role(ctx: &RequestContext, role: Role) -> Result<(), MarketplaceError> {
    if ctx.role == role || ctx.role == Role::Admin {
        Ok(())
    } else {
        Err(MarketplaceError::Forbidden(format!(
            "requires the {} role",
            role.label()
        )))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchRequest {
    pub candidates: Vec<WorkerProfile>,
}

/// Router builder exposing the marketplace operations over HTTP.
pub fn marketplace_router<S, D, N>(service: Arc<MarketplaceService<S, D, N>>) -> Router
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/jobs", post(create_job_handler::<S, D, N>))
        .route("/api/v1/jobs/:job_id", get(job_view_handler::<S, D, N>))
        .route(
            "/api/v1/jobs/:job_id/bids",
            post(submit_bid_handler::<S, D, N>).delete(withdraw_bid_handler::<S, D, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/accept/:bid_id",
            post(accept_bid_handler::<S, D, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/cancel",
            post(cancel_job_handler::<S, D, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/complete",
            post(complete_job_handler::<S, D, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/matches",
            post(match_workers_handler::<S, D, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/delay-risk",
            post(delay_risk_handler::<S, D, N>),
        )
        .route(
            "/api/v1/maintenance/expire-jobs",
            post(expire_jobs_handler::<S, D, N>),
        )
        .with_state(service)
}

/// Every error kind maps to a fixed status, and the body always carries
/// the kind tag so clients can tell apart kinds sharing a status.
fn error_response(err: MarketplaceError) -> Response {
    let status = match &err {
        MarketplaceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
        MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketplaceError::InvalidState(_) | MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
        MarketplaceError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = Json(json!({ "kind": err.kind(), "error": err.to_string() }));
    (status, body).into_response()
}

pub(crate) async fn create_job_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    headers: HeaderMap,
    Json(draft): Json<JobDraft>,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|ctx| {
        require_role(&ctx, Role::Buyer)?;
        service.create_job(&ctx.user_id, draft)
    });
    match outcome {
        Ok(job) => (StatusCode::CREATED, Json(job.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_view_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    match service.job(&JobId(job_id)) {
        Ok(job) => (StatusCode::OK, Json(job.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_bid_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BidRequest>,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|ctx| {
        require_role(&ctx, Role::Worker)?;
        service.submit_bid(&JobId(job_id), &WorkerId(ctx.user_id), request)
    });
    match outcome {
        Ok(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn withdraw_bid_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|ctx| {
        require_role(&ctx, Role::Worker)?;
        service.withdraw_bid(&JobId(job_id), &WorkerId(ctx.user_id))
    });
    match outcome {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn accept_bid_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path((job_id, bid_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|ctx| {
        require_role(&ctx, Role::Buyer)?;
        service.accept_bid(&ctx.user_id, &JobId(job_id), &BidId(bid_id))
    });
    match outcome {
        Ok(job) => (StatusCode::OK, Json(job.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_job_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CancelRequest>,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|ctx| {
        require_role(&ctx, Role::Buyer)?;
        service.cancel_job(&ctx.user_id, &JobId(job_id), &request.reason)
    });
    match outcome {
        Ok(job) => (StatusCode::OK, Json(job.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn complete_job_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|_ctx| service.complete_job(&JobId(job_id)));
    match outcome {
        Ok(job) => (StatusCode::OK, Json(job.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn match_workers_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<MatchRequest>,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome =
        context(&headers).and_then(|_ctx| service.match_workers(&JobId(job_id), &request.candidates));
    match outcome {
        Ok(matches) => (StatusCode::OK, Json(matches)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delay_risk_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    Json(features): Json<DelayRiskFeatures>,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome =
        context(&headers).and_then(|_ctx| service.estimate_delay_risk(&JobId(job_id), features));
    match outcome {
        Ok(assessment) => (StatusCode::OK, Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn expire_jobs_handler<S, D, N>(
    State(service): State<Arc<MarketplaceService<S, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    let outcome = context(&headers).and_then(|ctx| {
        require_role(&ctx, Role::Admin)?;
        service.expire_stale_jobs(Utc::now())
    });
    match outcome {
        Ok(expired) => (StatusCode::OK, Json(json!({ "expired": expired }))).into_response(),
        Err(err) => error_response(err),
    }
}
