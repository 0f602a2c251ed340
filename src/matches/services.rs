use anyhow::Context;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::repo::{self, SwipeAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    Matched,
    Liked,
    Passed,
}

impl SwipeOutcome {
    pub fn is_match(self) -> bool {
        self == SwipeOutcome::Matched
    }

    pub fn message(self) -> &'static str {
        match self {
            SwipeOutcome::Matched => "It's a match!",
            SwipeOutcome::Liked => "Like recorded",
            SwipeOutcome::Passed => "Pass recorded",
        }
    }
}

/// Record a like or pass and settle whether the pair is now mutual.
///
/// The pair lock makes two simultaneous likes observe each other: whichever
/// commits second sees the first one's row and flips both to mutual.
pub async fn record_swipe(
    db: &PgPool,
    user_id: Uuid,
    target_user_id: Uuid,
    action: SwipeAction,
) -> anyhow::Result<SwipeOutcome> {
    let mut tx = db.begin().await.context("begin tx")?;
    repo::lock_pair(&mut tx, user_id, target_user_id).await?;
    repo::upsert_swipe(&mut tx, user_id, target_user_id, action).await?;

    let outcome = match action {
        SwipeAction::Like => {
            if repo::has_liked(&mut tx, target_user_id, user_id).await? {
                repo::set_mutual(&mut tx, user_id, target_user_id, true).await?;
                SwipeOutcome::Matched
            } else {
                SwipeOutcome::Liked
            }
        }
        SwipeAction::Pass => {
            repo::set_mutual(&mut tx, user_id, target_user_id, false).await?;
            SwipeOutcome::Passed
        }
    };
    tx.commit().await.context("commit tx")?;

    if outcome.is_match() {
        info!(%user_id, %target_user_id, "match became mutual");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_messages() {
        assert!(SwipeOutcome::Matched.is_match());
        assert!(!SwipeOutcome::Liked.is_match());
        assert_eq!(SwipeOutcome::Matched.message(), "It's a match!");
        assert_eq!(SwipeOutcome::Passed.message(), "Pass recorded");
    }
}
