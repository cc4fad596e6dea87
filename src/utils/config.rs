use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub cors_allowed_origin: String,
    pub db_max_connections: u32,
    pub sweep_cron: String,
    pub sweep_grace_minutes: i64,
    pub max_request_body_kb: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            sweep_cron: env::var("SWEEP_CRON").unwrap_or_else(|_| "0 */5 * * * *".to_string()),
            sweep_grace_minutes: parse_or("SWEEP_GRACE_MINUTES", 60)?,
            max_request_body_kb: parse_or("MAX_REQUEST_BODY_KB", 1024)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("ADMISSION_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn parse_or_reports_bad_values() {
        env::set_var("ADMISSION_TEST_BAD_NUMBER", "ten");
        let result: Result<u32> = parse_or("ADMISSION_TEST_BAD_NUMBER", 7);
        assert!(result.is_err());
    }
}
