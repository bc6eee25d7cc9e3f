// Aggregate configuration with environment overrides

use crate::api::{ClientConfig, ClientError};
use crate::booking::BookingConfig;
use crate::forms::FormConfig;
use crate::search::SearchConfig;
use std::str::FromStr;

pub const ENV_BASE_URL: &str = "RENTACAR_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "RENTACAR_TIMEOUT_MS";
pub const ENV_DEBOUNCE_MS: &str = "RENTACAR_DEBOUNCE_MS";
pub const ENV_CONFIRMATION_DELAY_MS: &str = "RENTACAR_CONFIRMATION_DELAY_MS";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub booking: BookingConfig,
    pub search: SearchConfig,
    pub forms: FormConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Defaults overridden by whatever `lookup` returns for the
    // `RENTACAR_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.client.base_url = base_url;
        }
        if let Some(timeout_ms) = parse_var::<u64, _>(&lookup, ENV_TIMEOUT_MS)? {
            config.client.timeout_ms = Some(timeout_ms);
        }
        if let Some(debounce_ms) = parse_var(&lookup, ENV_DEBOUNCE_MS)? {
            config.search.debounce_ms = debounce_ms;
        }
        if let Some(delay_ms) = parse_var(&lookup, ENV_CONFIRMATION_DELAY_MS)? {
            config.booking.confirmation_delay_ms = delay_ms;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ClientError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ClientError::ConfigError(format!("{}={:?}: {}", key, raw, e))),
    }
}
