use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{CandidateRow, MutualRow};

#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    pub target_user_id: Uuid,
    pub action: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResponse {
    pub is_match: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub offering: Vec<String>,
    pub seeking: Vec<String>,
    pub tags: Vec<String>,
}

impl From<CandidateRow> for Candidate {
    fn from(r: CandidateRow) -> Self {
        let bio = r
            .bio
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| format!("Hi! I'm {}, excited to share my skills.", r.first_name));
        let tags = r.offering.iter().take(3).cloned().collect();
        Self {
            id: r.id,
            name: format!("{} {}", r.first_name, r.last_name),
            avatar_url: r.avatar_url,
            bio,
            location: r.location,
            occupation: r.occupation,
            offering: r.offering,
            seeking: r.seeking,
            tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub matches: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualMatch {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub occupation: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub matched_at: OffsetDateTime,
}

impl From<MutualRow> for MutualMatch {
    fn from(r: MutualRow) -> Self {
        Self {
            user_id: r.user_id,
            name: format!("{} {}", r.first_name, r.last_name),
            avatar_url: r.avatar_url,
            occupation: r.occupation,
            matched_at: r.matched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(bio: Option<&str>) -> CandidateRow {
        CandidateRow {
            id: Uuid::new_v4(),
            first_name: "Jane".into(),
            last_name: "Smith".into(),
            avatar_url: None,
            bio: bio.map(Into::into),
            location: Some("New York, NY".into()),
            occupation: Some("UX Designer".into()),
            offering: vec![
                "Adobe Creative Suite".into(),
                "Figma".into(),
                "Illustration".into(),
                "UI/UX Design".into(),
            ],
            seeking: vec!["JavaScript".into()],
        }
    }

    #[test]
    fn candidate_bio_falls_back_to_greeting() {
        let c = Candidate::from(row(None));
        assert_eq!(c.bio, "Hi! I'm Jane, excited to share my skills.");
        let c = Candidate::from(row(Some("  ")));
        assert_eq!(c.bio, "Hi! I'm Jane, excited to share my skills.");
        let c = Candidate::from(row(Some("Designer for hire")));
        assert_eq!(c.bio, "Designer for hire");
    }

    #[test]
    fn candidate_tags_are_first_three_offerings() {
        let c = Candidate::from(row(None));
        assert_eq!(c.name, "Jane Smith");
        assert_eq!(c.tags, vec!["Adobe Creative Suite", "Figma", "Illustration"]);
        assert_eq!(c.offering.len(), 4);
    }

    #[test]
    fn swipe_request_reads_camel_case() {
        let id = Uuid::new_v4();
        let req: SwipeRequest =
            serde_json::from_str(&format!(r#"{{"targetUserId":"{id}","action":"like"}}"#)).unwrap();
        assert_eq!(req.target_user_id, id);
        assert_eq!(req.action, "like");
    }
}
