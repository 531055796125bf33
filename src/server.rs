//! HTTP front end over a [`RelationClient`].
//!
//! Only one bulk run may be in flight per process: the remote side throttles
//! per account, so a second run would race the first on backoff and counts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bulk::BulkOutcome;
use crate::client::RelationClient;
use crate::error::Error;
use crate::transport::Transport;
use crate::types::{RelationAction, RelationRecord, UserInfo};

/// Application state shared across all requests
pub struct AppState<T> {
    client: Arc<RelationClient<T>>,
    bulk_lock: Arc<Mutex<()>>,
    metrics: Arc<Metrics>,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            bulk_lock: Arc::clone(&self.bulk_lock),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    fn track(&self) -> RequestGuard<'_> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
        RequestGuard(&self.requests_in_flight)
    }
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Build the Axum application with routes and middleware
pub fn build_app<T: Transport + 'static>(client: Arc<RelationClient<T>>) -> Router {
    let state = AppState {
        client,
        bulk_lock: Arc::new(Mutex::new(())),
        metrics: Arc::new(Metrics {
            total_requests: AtomicU64::new(0),
            requests_in_flight: AtomicU64::new(0),
            start_time: Instant::now(),
        }),
    };

    Router::new()
        .route("/health", get(health_check::<T>))
        .route("/api/user", get(user_info::<T>))
        .route("/api/following", get(list_following::<T>))
        .route("/api/follow", post(follow_one::<T>))
        .route("/api/unfollow", post(unfollow_one::<T>))
        .route("/api/unfollow-all", post(unfollow_all::<T>))
        .route("/api/batch", post(batch::<T>))
        .route("/api/metrics", get(get_metrics::<T>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check<T: Transport>(State(state): State<AppState<T>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dry_run: state.client.is_dry_run(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dry_run: bool,
}

async fn user_info<T: Transport>(
    State(state): State<AppState<T>>,
) -> Result<Json<UserResponse>, ApiError> {
    let _guard = state.metrics.track();
    let data = state.client.user_info().await?;
    Ok(Json(UserResponse {
        success: true,
        data,
    }))
}

#[derive(Serialize)]
struct UserResponse {
    success: bool,
    data: UserInfo,
}

async fn list_following<T: Transport>(State(state): State<AppState<T>>) -> Json<FollowingResponse> {
    let _guard = state.metrics.track();
    let data = state.client.list_all().await;
    Json(FollowingResponse {
        success: true,
        count: data.len(),
        data,
    })
}

#[derive(Serialize, Deserialize)]
pub struct FollowingResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<RelationRecord>,
}

#[derive(Serialize, Deserialize)]
pub struct RelationRequest {
    pub id: u64,
}

#[derive(Serialize, Deserialize)]
pub struct RelationResponse {
    pub success: bool,
    pub id: u64,
    pub action: RelationAction,
}

async fn mutate_one<T: Transport>(
    state: AppState<T>,
    request: RelationRequest,
    action: RelationAction,
) -> Result<Json<RelationResponse>, ApiError> {
    let _guard = state.metrics.track();
    if request.id == 0 {
        return Err(ApiError::BadRequest("id must be non-zero".to_string()));
    }
    tracing::info!("{} {}", action, request.id);
    let success = state.client.mutate(request.id, action).await;
    Ok(Json(RelationResponse {
        success,
        id: request.id,
        action,
    }))
}

async fn follow_one<T: Transport>(
    State(state): State<AppState<T>>,
    Json(request): Json<RelationRequest>,
) -> Result<Json<RelationResponse>, ApiError> {
    mutate_one(state, request, RelationAction::Follow).await
}

async fn unfollow_one<T: Transport>(
    State(state): State<AppState<T>>,
    Json(request): Json<RelationRequest>,
) -> Result<Json<RelationResponse>, ApiError> {
    mutate_one(state, request, RelationAction::Unfollow).await
}

/// The caller confirms by echoing the number of accounts it expects to touch.
#[derive(Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub confirm_count: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct BulkResponse {
    pub success: bool,
    pub data: BulkOutcome,
}

/// Explicit batch: `action` applied to `ids` in order.
#[derive(Serialize, Deserialize)]
pub struct BatchRequest {
    pub action: RelationAction,
    pub ids: Vec<u64>,
    #[serde(default)]
    pub confirm_count: Option<usize>,
}

/// Gate that accepts only the candidate count the caller echoed back.
fn count_gate(expected: Option<usize>) -> impl FnMut(usize) -> bool + Send + 'static {
    move |count| {
        if expected != Some(count) {
            tracing::warn!(?expected, count, "Bulk confirmation does not match candidates");
            return false;
        }
        true
    }
}

fn already_running() -> ApiError {
    ApiError::Conflict("a bulk operation is already running".to_string())
}

async fn unfollow_all<T: Transport>(
    State(state): State<AppState<T>>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let _guard = state.metrics.track();
    let Ok(_running) = state.bulk_lock.try_lock() else {
        return Err(already_running());
    };

    let data = state
        .client
        .unfollow_all()
        .confirm(count_gate(request.confirm_count))
        .run()
        .await;

    Ok(Json(BulkResponse {
        success: !data.cancelled,
        data,
    }))
}

async fn batch<T: Transport>(
    State(state): State<AppState<T>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let _guard = state.metrics.track();
    if request.ids.is_empty() || request.ids.contains(&0) {
        return Err(ApiError::BadRequest(
            "ids must be a non-empty list of non-zero ids".to_string(),
        ));
    }
    let Ok(_running) = state.bulk_lock.try_lock() else {
        return Err(already_running());
    };

    let candidates = request
        .ids
        .iter()
        .map(|&id| RelationRecord::new(id, id.to_string()))
        .collect();
    let data = state
        .client
        .bulk(request.action, candidates)
        .confirm(count_gate(request.confirm_count))
        .run()
        .await;

    Ok(Json(BulkResponse {
        success: !data.cancelled,
        data,
    }))
}

async fn get_metrics<T: Transport>(State(state): State<AppState<T>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_requests: state.metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: state.metrics.requests_in_flight.load(Ordering::Relaxed),
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct MetricsResponse {
    pub total_requests: u64,
    pub requests_in_flight: u64,
    pub uptime_seconds: u64,
}

/// API error types
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    Upstream(String),
    InternalError(String),
}

/// Code the API uses for requests without a valid session
const NOT_LOGGED_IN_CODE: i64 = -101;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        tracing::error!("Request error: {}", e);
        match &e {
            Error::RemoteRejected { code, .. } if *code == NOT_LOGGED_IN_CODE => {
                ApiError::Unauthorized(e.to_string())
            }
            Error::RemoteRejected { .. }
            | Error::RequestExhausted { .. }
            | Error::MalformedResponse(_)
            | Error::Transport(_) => ApiError::Upstream(e.to_string()),
            _ => ApiError::InternalError(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}
