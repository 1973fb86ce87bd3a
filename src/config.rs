use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    /// Offset of the school's local calendar from UTC, in hours.
    pub utc_offset_hours: i32,
    pub sweep_interval_secs: u64,
    pub sweep_grace_minutes: u32,
    pub session_cache_ttl_secs: u64,
    pub log_dir: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn or_default<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_scan_per_min: or_default("RATE_SCAN_PER_MIN", 120)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            utc_offset_hours: or_default("UTC_OFFSET_HOURS", 7)?,
            sweep_interval_secs: or_default("SWEEP_INTERVAL_SECS", 60)?,
            sweep_grace_minutes: or_default("SWEEP_GRACE_MINUTES", 10)?,
            session_cache_ttl_secs: or_default("SESSION_CACHE_TTL_SECS", 300)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        config.utc_offset()?;
        if config.sweep_interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be positive");
        }
        Ok(config)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .with_context(|| format!("UTC_OFFSET_HOURS out of range: {}", self.utc_offset_hours))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn session_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.session_cache_ttl_secs)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            api_prefix: "/api".to_string(),
            rate_scan_per_min: 120,
            rate_protected_per_min: 1000,
            utc_offset_hours: 7,
            sweep_interval_secs: 60,
            sweep_grace_minutes: 10,
            session_cache_ttl_secs: 300,
            log_dir: "logs".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_defaults_to_utc_plus_seven() {
        let config = Config::for_tests("secret");
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        let mut config = Config::for_tests("secret");
        config.utc_offset_hours = 30;
        assert!(config.utc_offset().is_err());
    }
}
