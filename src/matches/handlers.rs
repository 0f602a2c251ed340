use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{extractors::CurrentUser, repo_types::User},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    state::AppState,
    validation::Validator,
};

use super::dto::{CandidateQuery, CandidatesResponse, MutualMatch, SwipeRequest, SwipeResponse};
use super::repo::{self, SwipeAction};
use super::services::record_swipe;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_candidates).post(swipe))
        .route("/matches/mutual", get(list_mutual))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_candidates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<CandidateQuery>,
) -> ApiResult<Json<CandidatesResponse>> {
    let limit = q.limit.unwrap_or(10).clamp(1, 50);
    let rows = repo::list_candidates(&state.db, user.id, limit).await?;
    Ok(Json(CandidatesResponse {
        matches: rows.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, target_user_id = %payload.target_user_id))]
pub async fn swipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<SwipeRequest>,
) -> ApiResult<Json<SwipeResponse>> {
    let action = payload.action.parse::<SwipeAction>();
    Validator::new()
        .check(action.is_ok(), "action", "Action must be 'like' or 'pass'")
        .finish()?;
    let action = action.map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.target_user_id == user.id {
        return Err(ApiError::BadRequest("Cannot match with yourself".into()));
    }
    if !User::is_active(&state.db, payload.target_user_id).await? {
        warn!("swipe on missing or inactive user");
        return Err(ApiError::not_found("User not found"));
    }

    let outcome = record_swipe(&state.db, user.id, payload.target_user_id, action).await?;
    Ok(Json(SwipeResponse {
        is_match: outcome.is_match(),
        message: outcome.message(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_mutual(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<MutualMatch>>> {
    let rows = repo::list_mutual(&state.db, user.id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
