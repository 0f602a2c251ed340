use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    /// Credits granted (as a `bonus` ledger entry) when an account is created.
    pub initial_time_credits: i32,
    /// A user active within this many seconds is reported as online.
    pub online_window_seconds: i64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "skilltrade".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "skilltrade-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        Ok(Self {
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            initial_time_credits: env_or("INITIAL_TIME_CREDITS", 10),
            online_window_seconds: env_or("ONLINE_WINDOW_SECONDS", 300),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or("SKILLTRADE_TEST_UNSET_VAR", 42i64), 42);
        std::env::set_var("SKILLTRADE_TEST_GARBAGE_VAR", "not-a-number");
        assert_eq!(env_or("SKILLTRADE_TEST_GARBAGE_VAR", 7u32), 7);
        std::env::set_var("SKILLTRADE_TEST_SET_VAR", "15");
        assert_eq!(env_or("SKILLTRADE_TEST_SET_VAR", 7i32), 15);
    }
}
