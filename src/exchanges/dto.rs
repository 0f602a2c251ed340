use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Exchange;

/// The caller's side of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRole {
    Teacher,
    Student,
}

impl FromStr for ExchangeRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(ExchangeRole::Teacher),
            "student" => Ok(ExchangeRole::Student),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

impl ExchangeRole {
    /// `(teacher_id, student_id)` for a caller taking this role.
    pub fn assign(self, caller: Uuid, partner: Uuid) -> (Uuid, Uuid) {
        match self {
            ExchangeRole::Teacher => (caller, partner),
            ExchangeRole::Student => (partner, caller),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRequest {
    pub partner_id: Uuid,
    pub role: String,
    pub skill_offered: String,
    pub skill_requested: String,
    pub duration_minutes: Option<i32>,
    pub credits_amount: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExchangeQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteExchangeRequest {
    pub rating: Option<i32>,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeItem {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub partner_id: Uuid,
    pub role: ExchangeRole,
    pub skill_offered: String,
    pub skill_requested: String,
    pub duration_minutes: i32,
    pub credits_amount: i32,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub rating: Option<i32>,
    pub feedback: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ExchangeItem {
    pub fn for_viewer(ex: Exchange, viewer: Uuid) -> Self {
        let (role, partner_id) = if ex.teacher_id == viewer {
            (ExchangeRole::Teacher, ex.student_id)
        } else {
            (ExchangeRole::Student, ex.teacher_id)
        };
        Self {
            id: ex.id,
            teacher_id: ex.teacher_id,
            student_id: ex.student_id,
            partner_id,
            role,
            skill_offered: ex.skill_offered,
            skill_requested: ex.skill_requested,
            duration_minutes: ex.duration_minutes,
            credits_amount: ex.credits_amount,
            status: ex.status,
            scheduled_at: ex.scheduled_at,
            completed_at: ex.completed_at,
            rating: ex.rating,
            feedback: ex.feedback,
            created_at: ex.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExchangesResponse {
    pub exchanges: Vec<ExchangeItem>,
}
