use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config_env::{
    EnvLookup, optional_trimmed_env, parse_optional_u64_env, parse_u64_env,
};
use crate::settings::Language;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_QUICK_QUESTION_DELAY_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct AssistantClientConfig {
    pub api_base_url: Url,
    pub request_timeout_ms: Option<u64>,
    pub quick_question_delay_ms: u64,
    pub language: Language,
    pub admin_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AssistantClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let raw_base_url = optional_trimmed_env(lookup, "ASSISTANT_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&raw_base_url)?;

        let request_timeout_ms = parse_optional_u64_env(lookup, "ASSISTANT_REQUEST_TIMEOUT_MS")?;
        if request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfiguration(
                "ASSISTANT_REQUEST_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        let language = match optional_trimmed_env(lookup, "ASSISTANT_LANGUAGE") {
            Some(raw) => Language::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidConfiguration(format!(
                    "ASSISTANT_LANGUAGE must be 'en' or 'ar', got '{raw}'"
                ))
            })?,
            None => Language::En,
        };

        Ok(Self {
            api_base_url,
            request_timeout_ms,
            quick_question_delay_ms: parse_u64_env(
                lookup,
                "ASSISTANT_QUICK_QUESTION_DELAY_MS",
                DEFAULT_QUICK_QUESTION_DELAY_MS,
            )?,
            language,
            admin_token: optional_trimmed_env(lookup, "ASSISTANT_ADMIN_TOKEN"),
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn quick_question_delay(&self) -> Duration {
        Duration::from_millis(self.quick_question_delay_ms)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|err| {
        ConfigError::InvalidConfiguration(format!(
            "ASSISTANT_API_BASE_URL is not a valid url '{raw}': {err}"
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidConfiguration(
            "ASSISTANT_API_BASE_URL must start with http:// or https://".to_string(),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidConfiguration(
            "ASSISTANT_API_BASE_URL cannot be used as a base url".to_string(),
        ));
    }

    Ok(url)
}
