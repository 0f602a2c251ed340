use anyhow::Context;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::{dto::UserProfile, extractors::CurrentUser, repo_types::{ProfileChanges, User}},
    error::ApiResult,
    extract::ApiJson,
    state::AppState,
    validation::{is_valid_url, Validator},
};

use super::dto::UpdateProfileRequest;
use super::services::recompute_completion;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_profile).put(update_profile).delete(deactivate_profile),
    )
}

fn validate_update(req: &UpdateProfileRequest) -> ApiResult<()> {
    let mut v = Validator::new();
    if let Some(first) = &req.first_name {
        v.min_chars(first, 2, "firstName", "First name must be at least 2 characters");
    }
    if let Some(last) = &req.last_name {
        v.min_chars(last, 2, "lastName", "Last name must be at least 2 characters");
    }
    if let Some(site) = &req.website {
        let site = site.trim();
        v.check(site.is_empty() || is_valid_url(site), "website", "Invalid url");
    }
    if let Some(bio) = &req.bio {
        v.max_chars(bio, 2000, "bio", "Bio must be at most 2000 characters");
    }
    v.finish()
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user.into())
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    validate_update(&payload)?;
    let changes = ProfileChanges::from(payload);

    let mut tx = state.db.begin().await.context("begin tx")?;
    User::update_profile(&mut tx, user.id, &changes).await?;
    recompute_completion(&mut tx, user.id).await?;
    let updated = User::reload(&mut tx, user.id).await?;
    tx.commit().await.context("commit tx")?;

    info!("profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn deactivate_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<StatusCode> {
    User::deactivate(&state.db, user.id).await?;
    info!("account deactivated");
    Ok(StatusCode::NO_CONTENT)
}
