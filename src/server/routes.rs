use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::{
    stats::{service::StatsService, DayStat, UserStats},
    storage::{
        entities::{DayTotals, NodeEntity, SessionEntity},
        ingest::{record_session, IngestOutcome, NewSession},
        store::SessionStore,
    },
};

pub type SharedStore = Arc<dyn SessionStore>;

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Clone)]
pub struct AppState {
    stats: Arc<StatsService<SharedStore>>,
}

pub fn create_router(stats: StatsService<SharedStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/{id}",
            put(update_session).delete(delete_session),
        )
        .route("/api/user/stats", get(user_stats))
        .route("/api/aggs/daily", get(daily_aggregate))
        .route("/api/aggs/weekly", get(weekly_aggregate))
        .route("/api/nodes", post(create_node))
        .route("/api/nodes/suggestions", get(node_suggestions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState {
            stats: Arc::new(stats),
        })
}

fn invalid_json(rejection: JsonRejection) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("Invalid JSON: {}", rejection.body_text()),
    )
}

fn internal_error(context: &str) -> impl FnOnce(anyhow::Error) -> (StatusCode, String) + '_ {
    move |e| {
        error!("{context}: {e:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {e}"))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionEntity>> {
    Json(state.stats.recent_sessions().await)
}

#[derive(Serialize)]
struct SavedResponse {
    result: &'static str,
    id: String,
}

async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<NewSession>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavedResponse>)> {
    let Json(request) = payload.map_err(invalid_json)?;
    let now = state.stats.now().with_timezone(&Utc);

    match record_session(state.stats.store(), request, now)
        .await
        .map_err(internal_error("Database save failed"))?
    {
        IngestOutcome::Saved(id) => Ok((
            StatusCode::CREATED,
            Json(SavedResponse {
                result: "saved",
                id,
            }),
        )),
        IngestOutcome::DuplicateId(id) => Err((
            StatusCode::CONFLICT,
            format!("Session {id} already exists"),
        )),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionUpdate {
    #[serde(default)]
    draft_title: String,
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SessionUpdate>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(update) = payload.map_err(invalid_json)?;
    let updated = state
        .stats
        .store()
        .update_draft_title(&id, &update.draft_title)
        .await
        .map_err(internal_error("Update failed"))?;
    if updated {
        Ok(StatusCode::OK)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Session {id} not found")))
    }
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .stats
        .store()
        .delete_session(&id)
        .await
        .map_err(internal_error("Delete failed"))?;
    if deleted {
        Ok(StatusCode::OK)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Session {id} not found")))
    }
}

async fn user_stats(State(state): State<AppState>) -> Json<UserStats> {
    Json(state.stats.user_stats().await)
}

async fn daily_aggregate(State(state): State<AppState>) -> ApiResult<Json<DayTotals>> {
    let totals = state
        .stats
        .daily()
        .await
        .map_err(internal_error("Query failed"))?;
    Ok(Json(totals))
}

async fn weekly_aggregate(State(state): State<AppState>) -> ApiResult<Json<Vec<DayStat>>> {
    let days = state
        .stats
        .weekly()
        .await
        .map_err(internal_error("Query failed"))?;
    Ok(Json(days))
}

async fn node_suggestions(State(state): State<AppState>) -> Json<Vec<NodeEntity>> {
    Json(state.stats.suggestions().await)
}

#[derive(Deserialize)]
struct NodeRequest {
    title: String,
}

async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<NodeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<NodeEntity>)> {
    let Json(request) = payload.map_err(invalid_json)?;
    let now = state.stats.now().with_timezone(&Utc);
    let node = state
        .stats
        .store()
        .create_node(&request.title, now)
        .await
        .map_err(internal_error("Node creation failed"))?;
    Ok((StatusCode::CREATED, Json(node)))
}
