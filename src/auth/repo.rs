use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::repo_types::{ProfileChanges, User};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, avatar_url, bio, location,
    occupation, website, time_credits, profile_completion, is_verified, is_active,
    created_at, updated_at, last_active
"#;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    /// Find an active user by id.
    pub async fn find_active(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find active user")?;
        Ok(user)
    }

    /// Find an active user by id and stamp `last_active` in the same statement.
    pub async fn touch_active(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET last_active = now() WHERE id = $1 AND is_active = TRUE RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("touch last_active")?;
        Ok(user)
    }

    /// Create a new user with hashed password and an opening credit balance.
    pub async fn create(
        conn: &mut PgConnection,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        time_credits: i32,
    ) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, time_credits)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(password_hash)
            .bind(first_name)
            .bind(last_name)
            .bind(time_credits)
            .fetch_one(conn)
            .await
            .context("insert user")?;
        Ok(user)
    }

    /// Apply a partial profile update. Empty optional text clears the column.
    pub async fn update_profile(
        conn: &mut PgConnection,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                bio        = CASE WHEN $4::text IS NULL THEN bio        ELSE NULLIF($4, '') END,
                location   = CASE WHEN $5::text IS NULL THEN location   ELSE NULLIF($5, '') END,
                occupation = CASE WHEN $6::text IS NULL THEN occupation ELSE NULLIF($6, '') END,
                website    = CASE WHEN $7::text IS NULL THEN website    ELSE NULLIF($7, '') END,
                avatar_url = CASE WHEN $8::text IS NULL THEN avatar_url ELSE NULLIF($8, '') END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.location.as_deref())
        .bind(changes.occupation.as_deref())
        .bind(changes.website.as_deref())
        .bind(changes.avatar_url.as_deref())
        .execute(conn)
        .await
        .context("update profile")?;
        Ok(())
    }

    /// Reload a user inside an open transaction.
    pub async fn reload(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_one(conn)
            .await
            .context("reload user")?;
        Ok(user)
    }

    pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("deactivate user")?;
        Ok(())
    }

    /// True when `id` names an active account.
    pub async fn is_active(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let found: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(id)
                .fetch_optional(db)
                .await
                .context("check user active")?;
        Ok(found.is_some())
    }
}
