use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::error::Error;
use crate::pipeline::{Pipeline, RunSummary};
use crate::store::ItemRow;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/update", post(update_ranking))
        .route("/api/rankings/{id}", get(ranking_items))
        .route("/api/subscriptions", post(subscribe).delete(unsubscribe))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error shape on the wire; status follows the failure domain.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::RankingNotFound(_) => StatusCode::NOT_FOUND,
            Error::UnknownProvider(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Fetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateReq {
    ranking_id: String,
}

/// On-demand run for one ranking; failures propagate to the caller,
/// unlike the scheduled batch.
async fn update_ranking(
    State(state): State<AppState>,
    Json(body): Json<UpdateReq>,
) -> Result<Json<RunSummary>, ApiError> {
    let ranking = state
        .pipeline
        .store()
        .ranking(&body.ranking_id)
        .await?
        .ok_or_else(|| Error::RankingNotFound(body.ranking_id.clone()))?;

    let summary = state.pipeline.process_ranking(&ranking).await?;
    Ok(Json(summary))
}

/// Current snapshot, best score first, rank as tie-break.
async fn ranking_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ItemRow>>, ApiError> {
    let items = state.pipeline.store().items_by_score(&id).await?;
    Ok(Json(items))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionReq {
    ranking_id: String,
    player_id: String,
    /// Device-only clients omit this; the player id then doubles as
    /// the user key.
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(serde::Serialize)]
struct SubscriptionResp {
    success: bool,
}

async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscriptionReq>,
) -> Result<Json<SubscriptionResp>, ApiError> {
    let user = body.user_id.as_deref().unwrap_or(&body.player_id);
    state
        .pipeline
        .store()
        .subscribe(&body.ranking_id, user, &body.player_id)
        .await?;
    Ok(Json(SubscriptionResp { success: true }))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscriptionReq>,
) -> Result<Json<SubscriptionResp>, ApiError> {
    let user = body.user_id.as_deref().unwrap_or(&body.player_id);
    state
        .pipeline
        .store()
        .unsubscribe(&body.ranking_id, user)
        .await?;
    Ok(Json(SubscriptionResp { success: true }))
}
