use anyhow::Context;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::credits::repo::{adjust_balance, insert_entry, lock_balance, CreditKind, NewEntry};
use crate::error::ApiError;

use super::repo::{self, Exchange, ExchangeStatus};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("exchange not found")]
    NotFound,
    #[error("only the student can confirm an exchange")]
    NotStudent,
    #[error("exchange is already {0}")]
    NotScheduled(&'static str),
    #[error("insufficient time credits: balance {balance}, needed {needed}")]
    InsufficientCredits { balance: i32, needed: i32 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ExchangeError> for ApiError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::NotFound => ApiError::not_found("Exchange not found"),
            ExchangeError::NotStudent => {
                ApiError::Forbidden("Only the student can confirm an exchange".into())
            }
            ExchangeError::NotScheduled(status) => {
                ApiError::Conflict(format!("Exchange is already {status}"))
            }
            ExchangeError::InsufficientCredits { .. } => {
                ApiError::Conflict("Insufficient time credits".into())
            }
            ExchangeError::Internal(e) => ApiError::Internal(e),
        }
    }
}

/// Credits for a session: whole hours, rounded up, at least one.
pub fn default_credits(duration_minutes: i32) -> i32 {
    ((duration_minutes + 59) / 60).max(1)
}

/// Ensure a locked exchange is still open.
fn ensure_scheduled(ex: &Exchange) -> Result<(), ExchangeError> {
    match ex.status()? {
        ExchangeStatus::Scheduled => Ok(()),
        other => Err(ExchangeError::NotScheduled(other.as_str())),
    }
}

/// Settle a session: move credits from student to teacher and close it.
///
/// Both user rows are locked in id order so concurrent settlements touching
/// the same two users cannot deadlock.
pub async fn complete_exchange(
    db: &PgPool,
    exchange_id: Uuid,
    caller_id: Uuid,
    rating: Option<i32>,
    feedback: Option<&str>,
) -> Result<Exchange, ExchangeError> {
    let mut tx = db.begin().await.context("begin tx")?;

    let ex = repo::lock(&mut tx, exchange_id)
        .await?
        .filter(|ex| ex.involves(caller_id))
        .ok_or(ExchangeError::NotFound)?;
    if ex.student_id != caller_id {
        return Err(ExchangeError::NotStudent);
    }
    ensure_scheduled(&ex)?;

    let (first, second) = if ex.teacher_id < ex.student_id {
        (ex.teacher_id, ex.student_id)
    } else {
        (ex.student_id, ex.teacher_id)
    };
    let first_balance = lock_balance(&mut tx, first).await?;
    let second_balance = lock_balance(&mut tx, second).await?;
    let student_balance = if first == ex.student_id {
        first_balance
    } else {
        second_balance
    };

    let amount = ex.credits_amount;
    if student_balance < amount {
        return Err(ExchangeError::InsufficientCredits {
            balance: student_balance,
            needed: amount,
        });
    }

    adjust_balance(&mut tx, ex.student_id, -amount).await?;
    adjust_balance(&mut tx, ex.teacher_id, amount).await?;

    let learned = format!("Learned {}", ex.skill_offered);
    insert_entry(
        &mut tx,
        &NewEntry {
            user_id: ex.student_id,
            amount: -amount,
            kind: CreditKind::Spent,
            description: &learned,
            related_user_id: Some(ex.teacher_id),
            exchange_id: Some(ex.id),
        },
    )
    .await?;
    let taught = format!("Taught {}", ex.skill_offered);
    insert_entry(
        &mut tx,
        &NewEntry {
            user_id: ex.teacher_id,
            amount,
            kind: CreditKind::Earned,
            description: &taught,
            related_user_id: Some(ex.student_id),
            exchange_id: Some(ex.id),
        },
    )
    .await?;

    let done = repo::mark_completed(&mut tx, ex.id, rating, feedback).await?;
    tx.commit().await.context("commit tx")?;

    info!(exchange_id = %done.id, credits = amount, "exchange completed");
    Ok(done)
}

/// Cancel an open session. Either participant may cancel.
pub async fn cancel_exchange(
    db: &PgPool,
    exchange_id: Uuid,
    caller_id: Uuid,
) -> Result<Exchange, ExchangeError> {
    let mut tx = db.begin().await.context("begin tx")?;
    let ex = repo::lock(&mut tx, exchange_id)
        .await?
        .filter(|ex| ex.involves(caller_id))
        .ok_or(ExchangeError::NotFound)?;
    ensure_scheduled(&ex)?;
    let cancelled = repo::mark_cancelled(&mut tx, ex.id).await?;
    tx.commit().await.context("commit tx")?;

    info!(exchange_id = %cancelled.id, "exchange cancelled");
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use time::OffsetDateTime;

    fn exchange(status: &str) -> Exchange {
        Exchange {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            skill_offered: "Python Programming".into(),
            skill_requested: "Digital Marketing".into(),
            duration_minutes: 90,
            credits_amount: 2,
            status: status.into(),
            scheduled_at: None,
            completed_at: None,
            rating: None,
            feedback: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn credits_round_up_to_whole_hours() {
        assert_eq!(default_credits(15), 1);
        assert_eq!(default_credits(60), 1);
        assert_eq!(default_credits(61), 2);
        assert_eq!(default_credits(90), 2);
        assert_eq!(default_credits(480), 8);
    }

    #[test]
    fn only_scheduled_exchanges_are_open() {
        assert!(ensure_scheduled(&exchange("scheduled")).is_ok());
        assert!(matches!(
            ensure_scheduled(&exchange("completed")),
            Err(ExchangeError::NotScheduled("completed"))
        ));
        assert!(matches!(
            ensure_scheduled(&exchange("cancelled")),
            Err(ExchangeError::NotScheduled("cancelled"))
        ));
    }

    #[test]
    fn participants() {
        let ex = exchange("scheduled");
        assert!(ex.involves(ex.teacher_id));
        assert!(ex.involves(ex.student_id));
        assert!(!ex.involves(Uuid::new_v4()));
    }

    #[test]
    fn errors_map_to_http_statuses() {
        let status = |e: ExchangeError| ApiError::from(e).status_code();
        assert_eq!(status(ExchangeError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(ExchangeError::NotStudent), StatusCode::FORBIDDEN);
        assert_eq!(status(ExchangeError::NotScheduled("completed")), StatusCode::CONFLICT);
        assert_eq!(
            status(ExchangeError::InsufficientCredits { balance: 0, needed: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(ExchangeError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;

    use crate::auth::repo::fixtures::{balance_of, ledger_sum, seed_user};
    use crate::exchanges::repo::NewExchange;

    async fn schedule(db: &PgPool, teacher: Uuid, student: Uuid, credits: i32) -> Exchange {
        repo::insert(
            db,
            &NewExchange {
                teacher_id: teacher,
                student_id: student,
                skill_offered: "Guitar",
                skill_requested: "Spanish",
                duration_minutes: 60,
                credits_amount: credits,
                scheduled_at: None,
            },
        )
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn completion_moves_credits_and_keeps_ledger_in_step(pool: PgPool) {
        let teacher = seed_user(&pool, "teacher@example.com", 10).await;
        let student = seed_user(&pool, "student@example.com", 5).await;
        let ex = schedule(&pool, teacher.id, student.id, 2).await;

        let done = complete_exchange(&pool, ex.id, student.id, Some(5), Some("great"))
            .await
            .unwrap();
        assert_eq!(done.status, "completed");
        assert_eq!(done.rating, Some(5));
        assert!(done.completed_at.is_some());

        assert_eq!(balance_of(&pool, student.id).await, 3);
        assert_eq!(balance_of(&pool, teacher.id).await, 12);
        for user in [student.id, teacher.id] {
            assert_eq!(ledger_sum(&pool, user).await, balance_of(&pool, user).await);
        }

        let twice = complete_exchange(&pool, ex.id, student.id, None, None).await;
        assert!(matches!(twice, Err(ExchangeError::NotScheduled("completed"))));
        assert_eq!(balance_of(&pool, student.id).await, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn short_balance_is_refused_without_side_effects(pool: PgPool) {
        let teacher = seed_user(&pool, "teacher@example.com", 10).await;
        let student = seed_user(&pool, "student@example.com", 2).await;
        let ex = schedule(&pool, teacher.id, student.id, 3).await;

        let err = complete_exchange(&pool, ex.id, student.id, None, None).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InsufficientCredits { balance: 2, needed: 3 }));
        assert_eq!(
            ApiError::from(err).status_code(),
            axum::http::StatusCode::CONFLICT
        );

        assert_eq!(balance_of(&pool, student.id).await, 2);
        assert_eq!(balance_of(&pool, teacher.id).await, 10);
        assert_eq!(ledger_sum(&pool, student.id).await, 2);
        let listed = repo::list_for_user(&pool, student.id, Some(ExchangeStatus::Scheduled))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn only_the_student_can_complete(pool: PgPool) {
        let teacher = seed_user(&pool, "teacher@example.com", 10).await;
        let student = seed_user(&pool, "student@example.com", 10).await;
        let stranger = seed_user(&pool, "stranger@example.com", 10).await;
        let ex = schedule(&pool, teacher.id, student.id, 1).await;

        let by_teacher = complete_exchange(&pool, ex.id, teacher.id, None, None).await;
        assert!(matches!(by_teacher, Err(ExchangeError::NotStudent)));
        let by_stranger = complete_exchange(&pool, ex.id, stranger.id, None, None).await;
        assert!(matches!(by_stranger, Err(ExchangeError::NotFound)));
        assert_eq!(balance_of(&pool, teacher.id).await, 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn either_side_can_cancel_a_scheduled_exchange(pool: PgPool) {
        let teacher = seed_user(&pool, "teacher@example.com", 10).await;
        let student = seed_user(&pool, "student@example.com", 10).await;
        let ex = schedule(&pool, teacher.id, student.id, 1).await;

        let cancelled = cancel_exchange(&pool, ex.id, teacher.id).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");

        let again = cancel_exchange(&pool, ex.id, student.id).await;
        assert!(matches!(again, Err(ExchangeError::NotScheduled("cancelled"))));
        let complete = complete_exchange(&pool, ex.id, student.id, None, None).await;
        assert!(matches!(complete, Err(ExchangeError::NotScheduled("cancelled"))));
    }
}
