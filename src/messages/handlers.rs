use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::CurrentUser, repo_types::User},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    matches::repo::is_mutual,
    pagination::{PageInfo, Pagination},
    state::AppState,
    validation::Validator,
};

use super::dto::{
    thread_view, Conversation, ConversationsResponse, MessageItem, SendMessageRequest, ThreadResponse,
};
use super::repo;

const MAX_CONTENT_CHARS: usize = 1000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_conversations).post(send_message))
        .route("/messages/:user_id", get(get_thread))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ConversationsResponse>> {
    let rows = repo::list_conversations(&state.db, user.id).await?;
    let now = OffsetDateTime::now_utc();
    let window = state.config.online_window_seconds;
    Ok(Json(ConversationsResponse {
        conversations: rows
            .into_iter()
            .map(|r| Conversation::from_row(r, now, window))
            .collect(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, %other_id))]
pub async fn get_thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(other_id): ApiPath<Uuid>,
    ApiQuery(p): ApiQuery<Pagination>,
) -> ApiResult<Json<ThreadResponse>> {
    if !User::is_active(&state.db, other_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    let (limit, offset) = p.resolve(50);
    let page = repo::list_thread(&state.db, user.id, other_id, limit, offset).await?;
    let marked = repo::mark_read(&state.db, other_id, user.id).await?;
    debug!(marked, "thread read");

    let pagination = PageInfo::new(limit, offset, page.len());
    Ok(Json(ThreadResponse {
        messages: thread_view(page, user.id),
        pagination,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, receiver_id = %payload.receiver_id))]
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageItem>)> {
    let content = payload.content.trim();
    Validator::new()
        .min_chars(content, 1, "content", "Message must not be empty")
        .max_chars(content, MAX_CONTENT_CHARS, "content", "Message must be at most 1000 characters")
        .finish()?;

    if payload.receiver_id == user.id {
        return Err(ApiError::BadRequest("Cannot message yourself".into()));
    }
    if !User::is_active(&state.db, payload.receiver_id).await? {
        warn!("receiver missing or inactive");
        return Err(ApiError::not_found("Receiver not found"));
    }
    if !is_mutual(&state.db, user.id, payload.receiver_id).await? {
        warn!("message without mutual match");
        return Err(ApiError::Forbidden(
            "You can only message users you have matched with".into(),
        ));
    }

    let message = repo::insert(&state.db, user.id, payload.receiver_id, content).await?;
    info!(message_id = %message.id, "message sent");
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use sqlx::PgPool;

    use crate::auth::repo::fixtures::seed_user;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn deactivated_counterparts_leave_the_inbox(pool: PgPool) {
        let me = seed_user(&pool, "me@example.com", 0).await;
        let stays = seed_user(&pool, "stays@example.com", 0).await;
        let leaves = seed_user(&pool, "leaves@example.com", 0).await;
        repo::insert(&pool, me.id, stays.id, "hi").await.unwrap();
        repo::insert(&pool, leaves.id, me.id, "hello").await.unwrap();
        User::deactivate(&pool, leaves.id).await.unwrap();

        let state = AppState::with_pool(pool);
        let Json(inbox) = list_conversations(State(state.clone()), CurrentUser(me.clone()))
            .await
            .unwrap();
        assert_eq!(inbox.conversations.len(), 1);
        assert_eq!(inbox.conversations[0].user.id, stays.id);

        let thread = get_thread(
            State(state),
            CurrentUser(me),
            ApiPath(leaves.id),
            ApiQuery(Pagination::default()),
        )
        .await;
        assert!(matches!(thread, Err(ApiError::NotFound(_))));
    }
}
