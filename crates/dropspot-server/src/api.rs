use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use dropspot_core::{
    ClaimOutcome, ClaimWithDrop, DropClaims, DropDetails, DropEngine, DropFilter, DropSummary,
    DropUpdate, JoinOptions, JoinOutcome, NewDrop, UserWaitlistEntry, WaitlistView,
};
use dropspot_store::Drop;

use crate::auth::{optional_identity, require_identity, verify_admin_token};
use crate::config::ServerConfig;
use crate::error::ApiError;

const MIN_TITLE_LEN: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DropEngine>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/drops", get(browse_drops))
        .route("/drops/:id", get(get_drop))
        .route("/drops/:id/join", post(join_waitlist))
        .route("/drops/:id/leave", post(leave_waitlist))
        .route("/drops/:id/waitlist", get(list_waitlist))
        .route("/drops/:id/claim", post(claim_drop))
        .route("/me/claims", get(my_claims))
        .route("/me/waitlist", get(my_waitlist))
        .route("/claims/:code", get(claim_by_code))
        .route("/admin/drops", get(admin_list_drops).post(admin_create_drop))
        .route(
            "/admin/drops/:id",
            axum::routing::put(admin_update_drop).delete(admin_delete_drop),
        )
        .route("/admin/drops/:id/claims", get(admin_drop_claims))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run an engine call on the blocking pool. Every engine operation takes
/// the ledger lock and talks to SQLite synchronously.
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&DropEngine) -> dropspot_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || work(&engine))
        .await
        .map_err(|e| ApiError::Internal(format!("Engine task failed: {e}")))?
        .map_err(ApiError::from)
}

fn created_or_ok(is_new: bool) -> StatusCode {
    if is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(ApiError::BadRequest(format!(
            "Title must be at least {MIN_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

// ─── Response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: &'static str,
}

#[derive(Serialize)]
struct DropsResponse {
    drops: Vec<DropSummary>,
}

#[derive(Serialize)]
struct LeaveResponse {
    removed: bool,
}

#[derive(Serialize)]
struct ClaimsResponse {
    claims: Vec<ClaimWithDrop>,
}

#[derive(Serialize)]
struct WaitlistResponse {
    entries: Vec<UserWaitlistEntry>,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

#[derive(Deserialize)]
struct BrowseQuery {
    #[serde(default)]
    filter: DropFilter,
}

// ─── Public ───

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn browse_drops(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<DropsResponse>, ApiError> {
    let drops = blocking(&state, move |engine| engine.browse_drops(query.filter)).await?;
    Ok(Json(DropsResponse { drops }))
}

async fn get_drop(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DropDetails>, ApiError> {
    let viewer = optional_identity(&headers)?.map(|identity| identity.user_id);
    let details = blocking(&state, move |engine| engine.get_drop(id, viewer)).await?;
    Ok(Json(details))
}

async fn list_waitlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WaitlistView>, ApiError> {
    let view = blocking(&state, move |engine| engine.list_waitlist(id)).await?;
    Ok(Json(view))
}

// ─── Signed-in user ───

async fn join_waitlist(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<JoinOptions>, JsonRejection>,
) -> Result<(StatusCode, Json<JoinOutcome>), ApiError> {
    let identity = require_identity(&headers)?;
    // No JSON body at all means default signals; a broken one is rejected.
    let options = match body {
        Ok(Json(options)) => options,
        Err(JsonRejection::MissingJsonContentType(_)) => JoinOptions::default(),
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    };

    let outcome = blocking(&state, move |engine| {
        engine.join_waitlist(&identity, id, options)
    })
    .await?;
    Ok((created_or_ok(outcome.is_new), Json(outcome)))
}

async fn leave_waitlist(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let user_id = require_identity(&headers)?.user_id;
    let removed = blocking(&state, move |engine| engine.leave_waitlist(user_id, id)).await?;
    Ok(Json(LeaveResponse { removed }))
}

async fn claim_drop(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ClaimOutcome>), ApiError> {
    let user_id = require_identity(&headers)?.user_id;
    let outcome = blocking(&state, move |engine| engine.claim_drop(user_id, id)).await?;
    Ok((created_or_ok(outcome.is_new), Json(outcome)))
}

async fn my_claims(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<ClaimsResponse>, ApiError> {
    let user_id = require_identity(&headers)?.user_id;
    let claims = blocking(&state, move |engine| engine.user_claims(user_id)).await?;
    Ok(Json(ClaimsResponse { claims }))
}

async fn my_waitlist(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<WaitlistResponse>, ApiError> {
    let user_id = require_identity(&headers)?.user_id;
    let entries = blocking(&state, move |engine| engine.user_waitlist(user_id)).await?;
    Ok(Json(WaitlistResponse { entries }))
}

async fn claim_by_code(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ClaimWithDrop>, ApiError> {
    require_identity(&headers)?;
    let claim = blocking(&state, move |engine| engine.claim_by_code(&code)).await?;
    Ok(Json(claim))
}

// ─── Admin ───

async fn admin_list_drops(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<DropsResponse>, ApiError> {
    verify_admin_token(&headers, &state.config)?;
    let drops = blocking(&state, |engine| engine.list_drops()).await?;
    Ok(Json(DropsResponse { drops }))
}

async fn admin_create_drop(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(input): Json<NewDrop>,
) -> Result<(StatusCode, Json<Drop>), ApiError> {
    verify_admin_token(&headers, &state.config)?;
    check_title(&input.title)?;

    let drop = blocking(&state, move |engine| engine.create_drop(input)).await?;
    info!(drop = %drop.id, "Admin created drop");
    Ok((StatusCode::CREATED, Json(drop)))
}

async fn admin_update_drop(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<DropUpdate>,
) -> Result<Json<Drop>, ApiError> {
    verify_admin_token(&headers, &state.config)?;
    if let Some(ref title) = update.title {
        check_title(title)?;
    }

    let drop = blocking(&state, move |engine| engine.update_drop(id, update)).await?;
    info!(drop = %drop.id, "Admin updated drop");
    Ok(Json(drop))
}

async fn admin_delete_drop(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    verify_admin_token(&headers, &state.config)?;
    let deleted = blocking(&state, move |engine| engine.delete_drop(id)).await?;
    info!(drop = %id, "Admin deleted drop");
    Ok(Json(DeleteResponse { deleted }))
}

async fn admin_drop_claims(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DropClaims>, ApiError> {
    verify_admin_token(&headers, &state.config)?;
    let claims = blocking(&state, move |engine| engine.drop_claims(id)).await?;
    Ok(Json(claims))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
