use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::skills::repo::Skill;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSkillRequest {
    pub name: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub proficiency_level: Option<i32>,
    pub description: Option<String>,
}

/// Replaces the whole skill set with plain names.
#[derive(Debug, Deserialize)]
pub struct BulkSkillsRequest {
    pub offering: Vec<String>,
    pub seeking: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub proficiency_level: i32,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Skill> for SkillItem {
    fn from(s: Skill) -> Self {
        Self {
            id: s.id,
            name: s.name,
            category: s.category,
            kind: s.kind,
            proficiency_level: s.proficiency_level,
            description: s.description,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SkillsResponse {
    pub offering: Vec<SkillItem>,
    pub seeking: Vec<SkillItem>,
}

impl FromIterator<Skill> for SkillsResponse {
    fn from_iter<I: IntoIterator<Item = Skill>>(iter: I) -> Self {
        let mut out = SkillsResponse::default();
        for skill in iter {
            if skill.kind == "offering" {
                out.offering.push(skill.into());
            } else {
                out.seeking.push(skill.into());
            }
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
