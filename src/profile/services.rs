use anyhow::Context;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::auth::repo_types::User;

fn filled(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Percentage of the profile that is filled in.
///
/// Names and bio weigh 20 each, location and occupation 10 each, and having
/// at least one skill listed is worth the last 20.
pub fn profile_completion(user: &User, skill_count: i64) -> i32 {
    let weighted = [
        (filled(Some(&user.first_name)), 20),
        (filled(Some(&user.last_name)), 20),
        (filled(user.bio.as_deref()), 20),
        (filled(user.location.as_deref()), 10),
        (filled(user.occupation.as_deref()), 10),
        (skill_count > 0, 20),
    ];
    weighted
        .iter()
        .filter(|(ok, _)| *ok)
        .map(|(_, w)| w)
        .sum()
}

/// Recompute and store `profile_completion` for one user.
pub async fn recompute_completion(conn: &mut PgConnection, user_id: Uuid) -> anyhow::Result<i32> {
    let user = User::reload(&mut *conn, user_id).await?;
    let (skill_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM skills WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .context("count skills")?;

    let completion = profile_completion(&user, skill_count);
    if completion != user.profile_completion {
        sqlx::query("UPDATE users SET profile_completion = $2 WHERE id = $1")
            .bind(user_id)
            .bind(completion)
            .execute(&mut *conn)
            .await
            .context("store profile completion")?;
    }
    Ok(completion)
}
