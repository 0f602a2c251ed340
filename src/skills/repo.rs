use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Offering,
    Seeking,
}

impl SkillKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SkillKind::Offering => "offering",
            SkillKind::Seeking => "seeking",
        }
    }
}

impl FromStr for SkillKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offering" => Ok(SkillKind::Offering),
            "seeking" => Ok(SkillKind::Seeking),
            other => anyhow::bail!("unknown skill type {other:?}"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
    pub kind: String,
    pub proficiency_level: i32,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

pub struct NewSkill<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub kind: SkillKind,
    pub proficiency_level: i32,
    pub description: Option<&'a str>,
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Skill>> {
    let rows = sqlx::query_as::<_, Skill>(
        r#"
        SELECT id, user_id, name, category, kind, proficiency_level, description, created_at
          FROM skills
         WHERE user_id = $1
         ORDER BY created_at DESC, id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list skills")?;
    Ok(rows)
}

pub async fn insert(conn: &mut PgConnection, user_id: Uuid, skill: &NewSkill<'_>) -> anyhow::Result<Skill> {
    let row = sqlx::query_as::<_, Skill>(
        r#"
        INSERT INTO skills (user_id, name, category, kind, proficiency_level, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, name, category, kind, proficiency_level, description, created_at
        "#,
    )
    .bind(user_id)
    .bind(skill.name)
    .bind(skill.category)
    .bind(skill.kind.as_str())
    .bind(skill.proficiency_level)
    .bind(skill.description)
    .fetch_one(conn)
    .await
    .context("insert skill")?;
    Ok(row)
}

/// Remove every skill of the user. Returns how many were deleted.
pub async fn delete_all(conn: &mut PgConnection, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM skills WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .context("delete user skills")?;
    Ok(res.rows_affected())
}

/// Delete one skill if it belongs to `user_id`. Returns false when nothing matched.
pub async fn delete_owned(conn: &mut PgConnection, skill_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM skills WHERE id = $1 AND user_id = $2")
        .bind(skill_id)
        .bind(user_id)
        .execute(conn)
        .await
        .context("delete skill")?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_only_known_values() {
        assert_eq!("offering".parse::<SkillKind>().unwrap(), SkillKind::Offering);
        assert_eq!("seeking".parse::<SkillKind>().unwrap(), SkillKind::Seeking);
        assert!("Offering".parse::<SkillKind>().is_err());
        assert!("teaching".parse::<SkillKind>().is_err());
    }
}
