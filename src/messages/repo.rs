use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
}

/// Latest message per counterpart, with that counterpart's unread count.
#[derive(Debug, FromRow)]
pub struct ConversationRow {
    pub other_user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub last_active: OffsetDateTime,
    pub last_message: String,
    pub last_message_at: OffsetDateTime,
    pub unread_count: i64,
}

pub async fn insert(db: &PgPool, sender_id: Uuid, receiver_id: Uuid, content: &str) -> anyhow::Result<Message> {
    let row = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (sender_id, receiver_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, sender_id, receiver_id, content, is_read, created_at
        "#,
    )
    .bind(sender_id)
    .bind(receiver_id)
    .bind(content)
    .fetch_one(db)
    .await
    .context("insert message")?;
    Ok(row)
}

pub async fn list_conversations(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<ConversationRow>> {
    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"
        WITH mine AS (
            SELECT CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS other_id,
                   id, content, created_at
              FROM messages
             WHERE sender_id = $1 OR receiver_id = $1
        ),
        latest AS (
            SELECT DISTINCT ON (other_id) other_id, content, created_at
              FROM mine
             ORDER BY other_id, created_at DESC, id DESC
        )
        SELECT l.other_id AS other_user_id, u.first_name, u.last_name, u.avatar_url, u.last_active,
               l.content AS last_message, l.created_at AS last_message_at,
               (SELECT COUNT(*) FROM messages m
                 WHERE m.sender_id = l.other_id AND m.receiver_id = $1 AND NOT m.is_read) AS unread_count
          FROM latest l
          JOIN users u ON u.id = l.other_id
         WHERE u.is_active
         ORDER BY l.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list conversations")?;
    Ok(rows)
}

/// One page of a thread, newest first.
pub async fn list_thread(
    db: &PgPool,
    user_id: Uuid,
    other_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, sender_id, receiver_id, content, is_read, created_at
          FROM messages
         WHERE (sender_id = $1 AND receiver_id = $2)
            OR (sender_id = $2 AND receiver_id = $1)
         ORDER BY created_at DESC, id DESC
         LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(other_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list thread")?;
    Ok(rows)
}

/// Mark everything `sender_id` sent to `receiver_id` as read.
pub async fn mark_read(db: &PgPool, sender_id: Uuid, receiver_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(
        "UPDATE messages SET is_read = TRUE WHERE sender_id = $1 AND receiver_id = $2 AND NOT is_read",
    )
    .bind(sender_id)
    .bind(receiver_id)
    .execute(db)
    .await
    .context("mark messages read")?;
    Ok(res.rows_affected())
}
