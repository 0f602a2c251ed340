use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    error::{ApiError, ApiResult},
    profile::services::recompute_completion,
    extract::{ApiJson, ApiPath},
    state::AppState,
    validation::{non_blank, Validator},
};

use super::dto::{BulkSkillsRequest, CreateSkillRequest, MessageResponse, SkillItem, SkillsResponse};
use super::repo::{self, NewSkill, SkillKind, DEFAULT_CATEGORY};

const MAX_NAME_CHARS: usize = 200;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills).post(create_skill).put(replace_skills))
        .route("/skills/:id", delete(delete_skill))
}

/// Trim, reject blanks and overlong names, drop case-insensitive duplicates.
fn normalize_names(names: &[String], field: &'static str, v: &mut Validator) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            v.check(false, field, "Skill names must not be empty");
            continue;
        }
        if name.chars().count() > MAX_NAME_CHARS {
            v.check(false, field, "Skill names must be at most 200 characters");
            continue;
        }
        if !out.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            out.push(name.to_string());
        }
    }
    out
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_skills(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<SkillsResponse>> {
    let skills = repo::list_by_user(&state.db, user.id).await?;
    Ok(Json(skills.into_iter().collect()))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_skill(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CreateSkillRequest>,
) -> ApiResult<(StatusCode, Json<SkillItem>)> {
    let name = payload.name.trim();
    let kind = payload.kind.parse::<SkillKind>();
    let proficiency_level = payload.proficiency_level.unwrap_or(1);

    Validator::new()
        .min_chars(name, 1, "name", "Skill name is required")
        .max_chars(name, MAX_NAME_CHARS, "name", "Skill name must be at most 200 characters")
        .check(kind.is_ok(), "type", "Type must be 'offering' or 'seeking'")
        .range(proficiency_level, 1, 5, "proficiencyLevel", "Proficiency level must be between 1 and 5")
        .finish()?;
    let kind = kind.map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let category = non_blank(payload.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let description = non_blank(payload.description);

    let mut tx = state.db.begin().await.context("begin tx")?;
    let skill = repo::insert(
        &mut tx,
        user.id,
        &NewSkill {
            name,
            category: &category,
            kind,
            proficiency_level,
            description: description.as_deref(),
        },
    )
    .await?;
    recompute_completion(&mut tx, user.id).await?;
    tx.commit().await.context("commit tx")?;

    info!(skill_id = %skill.id, kind = kind.as_str(), "skill added");
    Ok((StatusCode::CREATED, Json(skill.into())))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn replace_skills(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<BulkSkillsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let mut v = Validator::new();
    let offering = normalize_names(&payload.offering, "offering", &mut v);
    let seeking = normalize_names(&payload.seeking, "seeking", &mut v);
    v.finish()?;

    // Dropping `tx` on any early return rolls the whole replacement back.
    let mut tx = state.db.begin().await.context("begin tx")?;
    repo::delete_all(&mut tx, user.id).await?;
    for (kind, names) in [(SkillKind::Offering, &offering), (SkillKind::Seeking, &seeking)] {
        for name in names {
            repo::insert(
                &mut tx,
                user.id,
                &NewSkill {
                    name: name.as_str(),
                    category: DEFAULT_CATEGORY,
                    kind,
                    proficiency_level: 1,
                    description: None,
                },
            )
            .await?;
        }
    }
    recompute_completion(&mut tx, user.id).await?;
    tx.commit().await.context("commit tx")?;

    info!(offering = offering.len(), seeking = seeking.len(), "skills replaced");
    Ok(Json(MessageResponse {
        message: "Skills updated successfully",
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, %skill_id))]
pub async fn delete_skill(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(skill_id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    if !repo::delete_owned(&mut tx, skill_id, user.id).await? {
        warn!("skill not found or not owned");
        return Err(ApiError::not_found("Skill not found"));
    }
    recompute_completion(&mut tx, user.id).await?;
    tx.commit().await.context("commit tx")?;

    Ok(Json(MessageResponse {
        message: "Skill deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_deduplicated() {
        let mut v = Validator::new();
        let names = normalize_names(
            &[" React ".into(), "react".into(), "Node.js".into()],
            "offering",
            &mut v,
        );
        assert!(v.finish().is_ok());
        assert_eq!(names, vec!["React".to_string(), "Node.js".to_string()]);
    }

    #[test]
    fn blank_names_are_reported() {
        let mut v = Validator::new();
        let names = normalize_names(&["Python".into(), "   ".into()], "seeking", &mut v);
        assert_eq!(names, vec!["Python".to_string()]);
        match v.finish() {
            Err(ApiError::Validation(details)) => assert_eq!(details[0].field, "seeking"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn grouping_splits_by_kind() {
        use crate::skills::repo::Skill;
        let skill = |kind: &str| Skill {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "UI/UX Design".into(),
            category: "Design".into(),
            kind: kind.into(),
            proficiency_level: 5,
            description: None,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let grouped: SkillsResponse =
            vec![skill("offering"), skill("seeking"), skill("offering")].into_iter().collect();
        assert_eq!(grouped.offering.len(), 2);
        assert_eq!(grouped.seeking.len(), 1);
        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(json["offering"][0]["proficiencyLevel"], 5);
        assert_eq!(json["offering"][0]["type"], "offering");
    }
}
