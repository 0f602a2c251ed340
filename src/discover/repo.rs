use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct DiscoverRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub proficiency_level: i32,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
}

pub struct DiscoverFilter<'a> {
    pub query: Option<&'a str>,
    pub category: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// `%text%` with LIKE metacharacters in `text` matched literally.
pub fn contains_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Offering skills of other active users, newest first.
pub async fn search_offerings(
    db: &PgPool,
    viewer_id: Uuid,
    filter: &DiscoverFilter<'_>,
) -> anyhow::Result<Vec<DiscoverRow>> {
    let pattern = filter.query.map(contains_pattern);
    let rows = sqlx::query_as::<_, DiscoverRow>(
        r#"
        SELECT s.id, s.name, s.category, s.description, s.proficiency_level,
               u.id AS user_id, u.first_name, u.last_name, u.avatar_url, u.location, u.occupation
          FROM skills s
          JOIN users u ON u.id = s.user_id
         WHERE s.kind = 'offering'
           AND s.user_id <> $1
           AND u.is_active
           AND ($2::text IS NULL OR s.name ILIKE $2 OR s.description ILIKE $2)
           AND ($3::text IS NULL OR s.category = $3)
         ORDER BY s.created_at DESC, s.id
         LIMIT $4 OFFSET $5
        "#,
    )
    .bind(viewer_id)
    .bind(pattern)
    .bind(filter.category)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(db)
    .await
    .context("search offerings")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_wraps_and_escapes() {
        assert_eq!(contains_pattern("react"), "%react%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("snake_case"), "%snake\\_case%");
        assert_eq!(contains_pattern(r"C:\"), r"%C:\\%");
    }
}
