use anyhow::Context;
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeStatus::Scheduled => "scheduled",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ExchangeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ExchangeStatus::Scheduled),
            "completed" => Ok(ExchangeStatus::Completed),
            "cancelled" => Ok(ExchangeStatus::Cancelled),
            other => anyhow::bail!("unknown exchange status {other:?}"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Exchange {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub skill_offered: String,
    pub skill_requested: String,
    pub duration_minutes: i32,
    pub credits_amount: i32,
    pub status: String,
    pub scheduled_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub rating: Option<i32>,
    pub feedback: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Exchange {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.teacher_id == user_id || self.student_id == user_id
    }

    pub fn status(&self) -> anyhow::Result<ExchangeStatus> {
        self.status.parse()
    }
}

pub struct NewExchange<'a> {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub skill_offered: &'a str,
    pub skill_requested: &'a str,
    pub duration_minutes: i32,
    pub credits_amount: i32,
    pub scheduled_at: Option<OffsetDateTime>,
}

const EXCHANGE_COLUMNS: &str = r#"
    id, teacher_id, student_id, skill_offered, skill_requested, duration_minutes,
    credits_amount, status, scheduled_at, completed_at, rating, feedback, created_at
"#;

pub async fn insert(db: &PgPool, new: &NewExchange<'_>) -> anyhow::Result<Exchange> {
    let sql = format!(
        r#"
        INSERT INTO exchanges
            (teacher_id, student_id, skill_offered, skill_requested, duration_minutes, credits_amount, scheduled_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {EXCHANGE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Exchange>(&sql)
        .bind(new.teacher_id)
        .bind(new.student_id)
        .bind(new.skill_offered)
        .bind(new.skill_requested)
        .bind(new.duration_minutes)
        .bind(new.credits_amount)
        .bind(new.scheduled_at)
        .fetch_one(db)
        .await
        .context("insert exchange")?;
    Ok(row)
}

pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    status: Option<ExchangeStatus>,
) -> anyhow::Result<Vec<Exchange>> {
    let sql = format!(
        r#"
        SELECT {EXCHANGE_COLUMNS}
          FROM exchanges
         WHERE (teacher_id = $1 OR student_id = $1)
           AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC, id
        "#
    );
    let rows = sqlx::query_as::<_, Exchange>(&sql)
        .bind(user_id)
        .bind(status.map(ExchangeStatus::as_str))
        .fetch_all(db)
        .await
        .context("list exchanges")?;
    Ok(rows)
}

/// Load an exchange and hold its row lock until the transaction ends.
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Option<Exchange>> {
    let sql = format!("SELECT {EXCHANGE_COLUMNS} FROM exchanges WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, Exchange>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("lock exchange")?;
    Ok(row)
}

pub async fn mark_completed(
    conn: &mut PgConnection,
    id: Uuid,
    rating: Option<i32>,
    feedback: Option<&str>,
) -> anyhow::Result<Exchange> {
    let sql = format!(
        r#"
        UPDATE exchanges
           SET status = 'completed', completed_at = now(), rating = $2, feedback = $3
         WHERE id = $1
        RETURNING {EXCHANGE_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Exchange>(&sql)
        .bind(id)
        .bind(rating)
        .bind(feedback)
        .fetch_one(conn)
        .await
        .context("complete exchange")?;
    Ok(row)
}

pub async fn mark_cancelled(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Exchange> {
    let sql = format!("UPDATE exchanges SET status = 'cancelled' WHERE id = $1 RETURNING {EXCHANGE_COLUMNS}");
    let row = sqlx::query_as::<_, Exchange>(&sql)
        .bind(id)
        .fetch_one(conn)
        .await
        .context("cancel exchange")?;
    Ok(row)
}
