use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::credits::repo::LedgerRow;
use crate::pagination::PageInfo;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRef {
    pub skill_offered: String,
    pub skill_requested: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub amount: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub exchange: Option<ExchangeRef>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(r: LedgerRow) -> Self {
        let exchange = match (r.skill_offered, r.skill_requested) {
            (Some(skill_offered), Some(skill_requested)) => Some(ExchangeRef {
                skill_offered,
                skill_requested,
                role: r.exchange_role,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            amount: r.amount,
            kind: r.kind,
            description: r.description,
            created_at: r.created_at,
            exchange,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub current_balance: i32,
    pub history: Vec<LedgerEntry>,
    pub pagination: PageInfo,
}
