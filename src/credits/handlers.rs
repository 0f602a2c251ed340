use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    error::ApiResult,
    pagination::{PageInfo, Pagination},
    extract::ApiQuery,
    state::AppState,
};

use super::dto::CreditsResponse;
use super::repo;

pub fn routes() -> Router<AppState> {
    Router::new().route("/time-credits", get(get_time_credits))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_time_credits(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> ApiResult<Json<CreditsResponse>> {
    let (limit, offset) = p.resolve(20);
    let rows = repo::list_history(&state.db, user.id, limit, offset).await?;
    let pagination = PageInfo::new(limit, offset, rows.len());

    Ok(Json(CreditsResponse {
        current_balance: user.time_credits,
        history: rows.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

#[cfg(test)]
mod tests {
    use crate::credits::dto::LedgerEntry;
    use crate::credits::repo::{CreditKind, LedgerRow};

    fn row(skill: Option<&str>) -> LedgerRow {
        LedgerRow {
            id: uuid::Uuid::new_v4(),
            amount: -2,
            kind: CreditKind::Spent.as_str().into(),
            description: "Learned Rust".into(),
            created_at: time::OffsetDateTime::now_utc(),
            skill_offered: skill.map(Into::into),
            skill_requested: skill.map(|_| "Design".into()),
            exchange_role: skill.map(|_| "learned".into()),
        }
    }

    #[test]
    fn ledger_entry_carries_exchange_when_joined() {
        let json = serde_json::to_value(LedgerEntry::from(row(Some("Rust")))).unwrap();
        assert_eq!(json["type"], "spent");
        assert_eq!(json["amount"], -2);
        assert_eq!(json["exchange"]["skillOffered"], "Rust");
        assert_eq!(json["exchange"]["role"], "learned");
    }

    #[test]
    fn ledger_entry_without_exchange_serializes_null() {
        let json = serde_json::to_value(LedgerEntry::from(row(None))).unwrap();
        assert!(json["exchange"].is_null());
    }
}

#[cfg(test)]
mod db_tests {
    use axum::{extract::State, Json};
    use sqlx::PgPool;

    use super::get_time_credits;
    use crate::auth::{extractors::CurrentUser, repo::fixtures::seed_user};
    use crate::extract::ApiQuery;
    use crate::pagination::Pagination;
    use crate::state::AppState;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn balance_comes_from_the_authenticated_row(pool: PgPool) {
        let user = seed_user(&pool, "credits@example.com", 10).await;
        let Json(res) = get_time_credits(
            State(AppState::with_pool(pool)),
            CurrentUser(user),
            ApiQuery(Pagination::default()),
        )
        .await
        .unwrap();
        assert_eq!(res.current_balance, 10);
        assert_eq!(res.history.len(), 1);
        assert_eq!(res.history[0].kind, "bonus");
        assert_eq!(res.history[0].amount, 10);
    }
}
