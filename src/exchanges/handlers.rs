use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::CurrentUser, repo_types::User},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery, OptionalJson},
    matches::repo::is_mutual,
    state::AppState,
    validation::{non_blank, Validator},
};

use super::dto::{
    CompleteExchangeRequest, CreateExchangeRequest, ExchangeItem, ExchangeQuery, ExchangeRole,
    ExchangesResponse,
};
use super::repo::{self, ExchangeStatus, NewExchange};
use super::services::{cancel_exchange, complete_exchange, default_credits};

const DEFAULT_DURATION_MINUTES: i32 = 60;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/exchanges", get(list_exchanges).post(create_exchange))
        .route("/exchanges/:id/complete", post(complete))
        .route("/exchanges/:id/cancel", post(cancel))
}

#[instrument(skip_all, fields(user_id = %user.id, partner_id = %payload.partner_id))]
pub async fn create_exchange(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CreateExchangeRequest>,
) -> ApiResult<(StatusCode, Json<ExchangeItem>)> {
    let role = payload.role.parse::<ExchangeRole>();
    let duration = payload.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    let credits = payload.credits_amount.unwrap_or_else(|| default_credits(duration));
    let skill_offered = payload.skill_offered.trim();
    let skill_requested = payload.skill_requested.trim();

    Validator::new()
        .check(role.is_ok(), "role", "Role must be 'teacher' or 'student'")
        .min_chars(skill_offered, 1, "skillOffered", "Skill offered is required")
        .max_chars(skill_offered, 200, "skillOffered", "Skill offered is too long")
        .min_chars(skill_requested, 1, "skillRequested", "Skill requested is required")
        .max_chars(skill_requested, 200, "skillRequested", "Skill requested is too long")
        .range(duration, 15, 480, "durationMinutes", "Duration must be between 15 and 480 minutes")
        .range(credits, 1, 100, "creditsAmount", "Credits must be between 1 and 100")
        .finish()?;
    let role = role.map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if payload.partner_id == user.id {
        return Err(ApiError::BadRequest("Cannot schedule an exchange with yourself".into()));
    }
    if !User::is_active(&state.db, payload.partner_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    if !is_mutual(&state.db, user.id, payload.partner_id).await? {
        return Err(ApiError::Forbidden(
            "You can only schedule exchanges with mutual matches".into(),
        ));
    }

    let (teacher_id, student_id) = role.assign(user.id, payload.partner_id);
    let ex = repo::insert(
        &state.db,
        &NewExchange {
            teacher_id,
            student_id,
            skill_offered,
            skill_requested,
            duration_minutes: duration,
            credits_amount: credits,
            scheduled_at: payload.scheduled_at,
        },
    )
    .await?;

    info!(exchange_id = %ex.id, "exchange scheduled");
    Ok((StatusCode::CREATED, Json(ExchangeItem::for_viewer(ex, user.id))))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_exchanges(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<ExchangeQuery>,
) -> ApiResult<Json<ExchangesResponse>> {
    let status = match non_blank(q.status) {
        Some(s) => Some(s.parse::<ExchangeStatus>().map_err(|_| {
            ApiError::BadRequest("Status must be scheduled, completed or cancelled".into())
        })?),
        None => None,
    };
    let rows = repo::list_for_user(&state.db, user.id, status).await?;
    Ok(Json(ExchangesResponse {
        exchanges: rows
            .into_iter()
            .map(|ex| ExchangeItem::for_viewer(ex, user.id))
            .collect(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, exchange_id = %id))]
pub async fn complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    OptionalJson(payload): OptionalJson<CompleteExchangeRequest>,
) -> ApiResult<Json<ExchangeItem>> {
    let payload = payload.unwrap_or_default();
    let feedback = non_blank(payload.feedback);

    let mut v = Validator::new();
    if let Some(rating) = payload.rating {
        v.range(rating, 1, 5, "rating", "Rating must be between 1 and 5");
    }
    if let Some(feedback) = &feedback {
        v.max_chars(feedback, 2000, "feedback", "Feedback must be at most 2000 characters");
    }
    v.finish()?;

    let ex = complete_exchange(&state.db, id, user.id, payload.rating, feedback.as_deref()).await?;
    Ok(Json(ExchangeItem::for_viewer(ex, user.id)))
}

#[instrument(skip_all, fields(user_id = %user.id, exchange_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ExchangeItem>> {
    let ex = cancel_exchange(&state.db, id, user.id).await?;
    Ok(Json(ExchangeItem::for_viewer(ex, user.id)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::{FromRequest, Request},
    };

    use crate::error::ApiError;
    use crate::exchanges::dto::CompleteExchangeRequest;
    use crate::extract::OptionalJson;

    async fn completion_body(body: &'static str) -> Result<Option<CompleteExchangeRequest>, ApiError> {
        let req = Request::builder().body(Body::from(body)).unwrap();
        OptionalJson::<CompleteExchangeRequest>::from_request(req, &())
            .await
            .map(|OptionalJson(p)| p)
    }

    #[tokio::test]
    async fn completion_without_a_body_has_no_rating() {
        assert!(completion_body("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completion_body_is_parsed() {
        let req = completion_body(r#"{"rating":4,"feedback":"great"}"#).await.unwrap().unwrap();
        assert_eq!(req.rating, Some(4));
        assert_eq!(req.feedback.as_deref(), Some("great"));
    }

    #[tokio::test]
    async fn non_numeric_rating_is_rejected_not_dropped() {
        match completion_body(r#"{"rating":"five","feedback":"great"}"#).await {
            Err(ApiError::Validation(details)) => assert_eq!(details[0].field, "rating"),
            other => panic!("unexpected: {:?}", other.map(|p| p.map(|r| r.rating))),
        }
    }
}
