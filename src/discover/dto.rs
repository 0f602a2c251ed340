use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pagination::PageInfo;

use super::repo::DiscoverRow;

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillOwner {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredSkill {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub proficiency_level: i32,
    pub tags: Vec<String>,
    pub user: SkillOwner,
}

impl From<DiscoverRow> for DiscoveredSkill {
    fn from(r: DiscoverRow) -> Self {
        let description = r
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Learn {} from an experienced practitioner", r.name));
        Self {
            id: r.id,
            tags: vec![r.category.clone(), r.name.clone()],
            title: r.name,
            description,
            category: r.category,
            proficiency_level: r.proficiency_level,
            user: SkillOwner {
                id: r.user_id,
                name: format!("{} {}", r.first_name, r.last_name),
                avatar_url: r.avatar_url,
                location: r.location,
                occupation: r.occupation,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub skills: Vec<DiscoveredSkill>,
    pub pagination: PageInfo,
}
