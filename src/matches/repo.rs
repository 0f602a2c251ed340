use anyhow::Context;
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeAction {
    Like,
    Pass,
}

impl SwipeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SwipeAction::Like => "like",
            SwipeAction::Pass => "pass",
        }
    }
}

impl FromStr for SwipeAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(SwipeAction::Like),
            "pass" => Ok(SwipeAction::Pass),
            other => anyhow::bail!("unknown action {other:?}"),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub offering: Vec<String>,
    pub seeking: Vec<String>,
}

#[derive(Debug, FromRow)]
pub struct MutualRow {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub occupation: Option<String>,
    pub matched_at: OffsetDateTime,
}

/// Key naming the unordered pair, so `(a, b)` and `(b, a)` share one lock.
pub fn pair_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("match:{lo}:{hi}")
}

/// Serialize swipes between two users until the transaction ends.
pub async fn lock_pair(conn: &mut PgConnection, a: Uuid, b: Uuid) -> anyhow::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(pair_key(a, b))
        .execute(conn)
        .await
        .context("lock match pair")?;
    Ok(())
}

/// Record the caller's swipe; a repeated swipe replaces the earlier one.
pub async fn upsert_swipe(
    conn: &mut PgConnection,
    user_id: Uuid,
    target_user_id: Uuid,
    action: SwipeAction,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO matches (user_id, target_user_id, action)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, target_user_id)
        DO UPDATE SET action = EXCLUDED.action, is_mutual = FALSE, updated_at = now()
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(target_user_id)
    .bind(action.as_str())
    .fetch_one(conn)
    .await
    .context("upsert swipe")?;
    Ok(id)
}

pub async fn has_liked(conn: &mut PgConnection, from: Uuid, to: Uuid) -> anyhow::Result<bool> {
    let (liked,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM matches
             WHERE user_id = $1 AND target_user_id = $2 AND action = 'like'
        )
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(conn)
    .await
    .context("check like")?;
    Ok(liked)
}

/// Set the mutual flag on both directions of a pair.
pub async fn set_mutual(conn: &mut PgConnection, a: Uuid, b: Uuid, mutual: bool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE matches SET is_mutual = $3, updated_at = now()
         WHERE (user_id = $1 AND target_user_id = $2)
            OR (user_id = $2 AND target_user_id = $1)
        "#,
    )
    .bind(a)
    .bind(b)
    .bind(mutual)
    .execute(conn)
    .await
    .context("set mutual")?;
    Ok(())
}

pub async fn is_mutual(db: &PgPool, a: Uuid, b: Uuid) -> anyhow::Result<bool> {
    let (mutual,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM matches
             WHERE user_id = $1 AND target_user_id = $2 AND is_mutual
        )
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(db)
    .await
    .context("check mutual match")?;
    Ok(mutual)
}

/// Active users offering something the caller seeks, not yet swiped on.
pub async fn list_candidates(db: &PgPool, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<CandidateRow>> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT u.id, u.first_name, u.last_name, u.avatar_url, u.bio, u.location, u.occupation,
               COALESCE(array_agg(DISTINCT s.name) FILTER (WHERE s.kind = 'offering'), '{}'::text[]) AS offering,
               COALESCE(array_agg(DISTINCT s.name) FILTER (WHERE s.kind = 'seeking'), '{}'::text[]) AS seeking
          FROM users u
          JOIN skills s ON s.user_id = u.id
         WHERE u.id <> $1
           AND u.is_active
           AND EXISTS (
                SELECT 1
                  FROM skills offered
                  JOIN skills wanted ON lower(wanted.name) = lower(offered.name)
                 WHERE offered.user_id = u.id AND offered.kind = 'offering'
                   AND wanted.user_id = $1 AND wanted.kind = 'seeking'
           )
           AND NOT EXISTS (
                SELECT 1 FROM matches m
                 WHERE m.user_id = $1 AND m.target_user_id = u.id
           )
         GROUP BY u.id
         ORDER BY random()
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list match candidates")?;
    Ok(rows)
}

pub async fn list_mutual(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<MutualRow>> {
    let rows = sqlx::query_as::<_, MutualRow>(
        r#"
        SELECT u.id AS user_id, u.first_name, u.last_name, u.avatar_url, u.occupation,
               m.updated_at AS matched_at
          FROM matches m
          JOIN users u ON u.id = m.target_user_id
         WHERE m.user_id = $1 AND m.is_mutual AND u.is_active
         ORDER BY m.updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list mutual matches")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(pair_key(a, b), pair_key(b, a));
        assert_ne!(pair_key(a, b), pair_key(a, Uuid::new_v4()));
    }

    #[test]
    fn action_parses_only_known_values() {
        assert_eq!("like".parse::<SwipeAction>().unwrap(), SwipeAction::Like);
        assert_eq!("pass".parse::<SwipeAction>().unwrap(), SwipeAction::Pass);
        assert!("superlike".parse::<SwipeAction>().is_err());
    }
}
