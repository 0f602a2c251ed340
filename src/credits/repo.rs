use anyhow::Context;
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Earned,
    Spent,
    Bonus,
}

impl CreditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditKind::Earned => "earned",
            CreditKind::Spent => "spent",
            CreditKind::Bonus => "bonus",
        }
    }
}

/// A ledger row about to be written. `amount` is signed: spending is negative.
pub struct NewEntry<'a> {
    pub user_id: Uuid,
    pub amount: i32,
    pub kind: CreditKind,
    pub description: &'a str,
    pub related_user_id: Option<Uuid>,
    pub exchange_id: Option<Uuid>,
}

/// Ledger row joined with the exchange it settles, if any.
#[derive(Debug, FromRow)]
pub struct LedgerRow {
    pub id: Uuid,
    pub amount: i32,
    pub kind: String,
    pub description: String,
    pub created_at: OffsetDateTime,
    pub skill_offered: Option<String>,
    pub skill_requested: Option<String>,
    pub exchange_role: Option<String>,
}

/// Write a ledger entry. Callers move the balance in the same transaction.
pub async fn insert_entry(conn: &mut PgConnection, entry: &NewEntry<'_>) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO time_credit_transactions
            (user_id, amount, kind, description, related_user_id, exchange_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.amount)
    .bind(entry.kind.as_str())
    .bind(entry.description)
    .bind(entry.related_user_id)
    .bind(entry.exchange_id)
    .fetch_one(conn)
    .await
    .context("insert ledger entry")?;
    Ok(id)
}

/// Add `delta` to a balance. Fails (CHECK constraint) if it would go negative.
pub async fn adjust_balance(conn: &mut PgConnection, user_id: Uuid, delta: i32) -> anyhow::Result<i32> {
    let (balance,): (i32,) = sqlx::query_as(
        r#"
        UPDATE users SET time_credits = time_credits + $2, updated_at = now()
        WHERE id = $1
        RETURNING time_credits
        "#,
    )
    .bind(user_id)
    .bind(delta)
    .fetch_one(conn)
    .await
    .context("adjust balance")?;
    Ok(balance)
}

/// Lock a user's row and return its balance.
pub async fn lock_balance(conn: &mut PgConnection, user_id: Uuid) -> anyhow::Result<i32> {
    let (balance,): (i32,) =
        sqlx::query_as("SELECT time_credits FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(conn)
            .await
            .context("lock balance")?;
    Ok(balance)
}

pub async fn list_history(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<LedgerRow>> {
    let rows = sqlx::query_as::<_, LedgerRow>(
        r#"
        SELECT t.id, t.amount, t.kind, t.description, t.created_at,
               e.skill_offered, e.skill_requested,
               CASE
                   WHEN e.teacher_id = $1 THEN 'taught'
                   WHEN e.student_id = $1 THEN 'learned'
               END AS exchange_role
          FROM time_credit_transactions t
          LEFT JOIN exchanges e ON e.id = t.exchange_id
         WHERE t.user_id = $1
         ORDER BY t.created_at DESC, t.id
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list ledger history")?;
    Ok(rows)
}
