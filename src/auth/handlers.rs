use anyhow::Context;
use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UserProfile},
        extractors::CurrentUser,
        repo_types::User,
        services::{hash_password, verify_password, JwtKeys},
    },
    credits::repo::{insert_entry, CreditKind, NewEntry},
    error::{is_unique_violation, ApiError, ApiResult},
    profile::services::recompute_completion,
    extract::ApiJson,
    state::AppState,
    validation::{is_strong_password, is_valid_email, Validator},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let pair = JwtKeys::from_ref(state).sign_pair(user.id)?;
    Ok(AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.into(),
    })
}

fn validate_registration(payload: &RegisterRequest) -> ApiResult<()> {
    Validator::new()
        .min_chars(&payload.first_name, 2, "firstName", "First name must be at least 2 characters")
        .min_chars(&payload.last_name, 2, "lastName", "Last name must be at least 2 characters")
        .check(is_valid_email(&payload.email), "email", "Invalid email address")
        .check(
            is_strong_password(&payload.password),
            "password",
            "Password must be at least 8 characters and contain uppercase, lowercase, and number",
        )
        .check(
            payload.password == payload.confirm_password,
            "confirmPassword",
            "Passwords don't match",
        )
        .finish()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    payload.first_name = payload.first_name.trim().to_string();
    payload.last_name = payload.last_name.trim().to_string();

    if let Err(e) = validate_registration(&payload) {
        warn!(email = %payload.email, "registration rejected");
        return Err(e);
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let welcome = state.config.initial_time_credits.max(0);

    let mut tx = state.db.begin().await.context("begin tx")?;
    let user = match User::create(
        &mut tx,
        &payload.email,
        &hash,
        &payload.first_name,
        &payload.last_name,
        welcome,
    )
    .await
    {
        Ok(u) => u,
        // Lost a race with a concurrent registration for the same email.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::Conflict("User with this email already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };
    if welcome > 0 {
        insert_entry(
            &mut tx,
            &NewEntry {
                user_id: user.id,
                amount: welcome,
                kind: CreditKind::Bonus,
                description: "Welcome bonus",
                related_user_id: None,
                exchange_id: None,
            },
        )
        .await?;
    }
    recompute_completion(&mut tx, user.id).await?;
    let user = User::reload(&mut tx, user.id).await?;
    tx.commit().await.context("commit tx")?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    Validator::new()
        .check(is_valid_email(&payload.email), "email", "Invalid email address")
        .check(!payload.password.is_empty(), "password", "Password is required")
        .finish()?;

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(invalid());
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(invalid());
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthorized("Invalid token")
    })?;

    let user = User::find_active(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user.into())
}


#[cfg(test)]
mod db_tests {
    use super::*;
    use sqlx::PgPool;

    use crate::auth::repo::fixtures::ledger_sum;
    use crate::extract::ApiJson;

    fn signup(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Jane".into(),
            last_name: "Smith".into(),
            email: email.into(),
            password: "Passw0rd!".into(),
            confirm_password: "Passw0rd!".into(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn duplicate_email_is_a_conflict(pool: PgPool) {
        let state = AppState::with_pool(pool.clone());
        let Json(first) = register(State(state.clone()), ApiJson(signup("jane@example.com")))
            .await
            .unwrap();
        assert_eq!(first.user.time_credits, 10);
        assert_eq!(ledger_sum(&pool, first.user.id).await, 10);

        let again = register(State(state.clone()), ApiJson(signup("Jane@Example.com "))).await;
        match again {
            Err(ApiError::Conflict(msg)) => assert_eq!(msg, "User with this email already exists"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("second registration succeeded"),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn racing_insert_is_detected_as_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        User::create(&mut conn, "race@example.com", "h", "Ann", "Lee", 0).await.unwrap();
        let err = User::create(&mut conn, "race@example.com", "h", "Ann", "Lee", 0)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL database"]
    async fn login_rejects_wrong_password(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register(State(state.clone()), ApiJson(signup("ann@example.com"))).await.unwrap();

        let ok = login(
            State(state.clone()),
            ApiJson(LoginRequest { email: "ann@example.com".into(), password: "Passw0rd!".into() }),
        )
        .await;
        assert!(ok.is_ok());

        let bad = login(
            State(state),
            ApiJson(LoginRequest { email: "ann@example.com".into(), password: "Wrong1234".into() }),
        )
        .await;
        assert!(matches!(bad, Err(ApiError::Unauthorized(_))));
    }
}
