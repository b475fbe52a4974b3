//! Environment-driven service configuration.

use anyhow::Context;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Currency code stamped on carts, orders and refunds.
    pub currency: String,
    /// Offset added to the checkout timestamp to estimate delivery.
    pub delivery_offset_days: i64,
    /// i32 to match Postgres `make_interval(hours => int)`.
    pub session_ttl_hours: i32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            port: env_parse("PORT", 8083)?,
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "MXN".to_string()),
            delivery_offset_days: env_parse("DELIVERY_OFFSET_DAYS", 5)?,
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", 720)?,
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_to_default() {
        assert_eq!(env_parse("TIENDITA_TEST_UNSET_KEY", 5i64).unwrap(), 5);
        assert_eq!(env_parse("TIENDITA_TEST_UNSET_KEY", 720i32).unwrap(), 720);
    }
}
