use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::NaiveTime;
use dotenvy::dotenv;
use strum_macros::EnumString;

/// Where record collections are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Mysql,
}

/// Office hours used to derive attendance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkPolicy {
    pub work_start: NaiveTime,
    pub late_grace_minutes: u32,
}

impl Default for WorkPolicy {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            late_grace_minutes: 0,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Storage
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,

    // Seeded on first start when the users collection is empty
    pub admin_username: String,
    pub admin_password: Option<String>,

    pub work_policy: WorkPolicy,
    pub log_dir: PathBuf,
}

/// Reads `key`, falling back to `default`, and parses it.
fn env_or<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("invalid value {raw:?} for {key}: {e}"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let work_start = env::var("WORK_START").unwrap_or_else(|_| "09:00".to_string());
        let work_start = NaiveTime::parse_from_str(work_start.trim(), "%H:%M")
            .with_context(|| format!("invalid value {work_start:?} for WORK_START (HH:MM)"))?;

        let storage_backend: StorageBackend = env_or("STORAGE_BACKEND", "file")?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Mysql && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORAGE_BACKEND=mysql"));
        }

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: env_or("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: env_or("REFRESH_TOKEN_TTL", "604800")?, // 7 days

            rate_login_per_min: env_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: env_or("RATE_REGISTER_PER_MIN", "30")?,
            rate_refresh_per_min: env_or("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            storage_backend,
            data_dir: env_or("DATA_DIR", "data")?,
            database_url,

            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),

            work_policy: WorkPolicy {
                work_start,
                late_grace_minutes: env_or("LATE_GRACE_MINUTES", "0")?,
            },
            log_dir: env_or("LOG_DIR", "logs")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_lowercase_names() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("file".parse::<StorageBackend>().unwrap(), StorageBackend::File);
        assert_eq!("mysql".parse::<StorageBackend>().unwrap(), StorageBackend::Mysql);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn default_policy_starts_at_nine() {
        let policy = WorkPolicy::default();
        assert_eq!(policy.work_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(policy.late_grace_minutes, 0);
    }

    #[test]
    fn env_or_falls_back_and_rejects_garbage() {
        let v: u32 = env_or("HRDESK_TEST_UNSET_VARIABLE", "42").unwrap();
        assert_eq!(v, 42);
        let bad: anyhow::Result<u32> = env_or("HRDESK_TEST_UNSET_VARIABLE", "forty");
        assert!(bad.is_err());
    }
}
