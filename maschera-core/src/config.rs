//! Configuration management for `maschera-core`.
//!
//! This module defines the masking configuration consumed by the redactor and
//! the process settings read from the environment at startup. Settings are
//! validated eagerly: a missing or blank value stops the process before the
//! masking loop is ever started.
//!
//! License: MIT OR Apache-2.0

use std::collections::HashSet;
use std::fmt;

use log::{debug, warn};
use thiserror::Error;

pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_JSON_FIELDS_WITH_PII: &str = "JSON_FIELDS_WITH_PII";
pub const ENV_PII_MASKER_SECRET: &str = "PII_MASKER_SECRET";
pub const ENV_TOPIC_PII: &str = "TOPIC_PII";
pub const ENV_TOPIC_MASKED: &str = "TOPIC_MASKED";
pub const ENV_TOPIC_PII_PATH: &str = "TOPIC_PII_PATH";
pub const ENV_TOPIC_MASKED_PATH: &str = "TOPIC_MASKED_PATH";
pub const ENV_MAX_RECORD_BYTES: &str = "MAX_RECORD_BYTES";

/// Largest record payload the line source accepts unless overridden.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 10_000_000;

/// Errors raised while reading settings from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(String),

    #[error("Required environment variable {0} cannot be empty")]
    Empty(String),

    #[error("Required environment variable {0} cannot contain empty elements")]
    EmptyElement(String),

    #[error("Invalid value '{value}' for environment variable {key}")]
    Invalid { key: String, value: String },
}

/// The deployment environment, which selects the logging profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "dev" => Ok(AppEnv::Development),
            "prod" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            _ => Err(ConfigError::Invalid {
                key: ENV_APP_ENV.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AppEnv::Development => "dev",
            AppEnv::Production => "prod",
            AppEnv::Test => "test",
        };
        f.write_str(name)
    }
}

/// The ordered set of JSON field names treated as PII-bearing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskingConfig {
    fields: Vec<String>,
}

impl MaskingConfig {
    /// Builds a masking configuration, rejecting an empty set or blank names.
    /// Duplicate names are dropped, keeping the first occurrence.
    pub fn new<I, S>(fields: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for field in fields {
            let field: String = field.into();
            if field.trim().is_empty() {
                return Err(ConfigError::EmptyElement(ENV_JSON_FIELDS_WITH_PII.to_string()));
            }
            if seen.insert(field.clone()) {
                unique.push(field);
            } else {
                warn!("PII field '{}' is configured more than once.", field);
            }
        }

        if unique.is_empty() {
            return Err(ConfigError::Empty(ENV_JSON_FIELDS_WITH_PII.to_string()));
        }

        Ok(Self { fields: unique })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Process settings supplied through the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_env: AppEnv,
    pub masking: MaskingConfig,
    pub pii_masker_secret: String,
    pub topic_pii: String,
    pub topic_masked: String,
    pub topic_pii_path: String,
    pub topic_masked_path: String,
    pub max_record_bytes: usize,
}

// The secret never reaches a log line through `{:?}`.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_env", &self.app_env)
            .field("masking", &self.masking)
            .field("pii_masker_secret", &"<redacted>")
            .field("topic_pii", &self.topic_pii)
            .field("topic_masked", &self.topic_masked)
            .field("topic_pii_path", &self.topic_pii_path)
            .field("topic_masked_path", &self.topic_masked_path)
            .field("max_record_bytes", &self.max_record_bytes)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup, so callers (and tests)
    /// can supply values without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = AppEnv::parse(&required_string(&lookup, ENV_APP_ENV)?)?;
        let masking = MaskingConfig::new(required_list(&lookup, ENV_JSON_FIELDS_WITH_PII)?)?;

        let max_record_bytes = match lookup(ENV_MAX_RECORD_BYTES) {
            None => DEFAULT_MAX_RECORD_BYTES,
            Some(raw) => parse_positive(ENV_MAX_RECORD_BYTES, &raw)?,
        };

        let settings = Self {
            app_env,
            masking,
            pii_masker_secret: required_string(&lookup, ENV_PII_MASKER_SECRET)?,
            topic_pii: required_string(&lookup, ENV_TOPIC_PII)?,
            topic_masked: required_string(&lookup, ENV_TOPIC_MASKED)?,
            topic_pii_path: required_string(&lookup, ENV_TOPIC_PII_PATH)?,
            topic_masked_path: required_string(&lookup, ENV_TOPIC_MASKED_PATH)?,
            max_record_bytes,
        };

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }
}

/// Returns the trimmed value of a required variable.
pub fn required_string<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::Missing(key.to_string()))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(key.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Returns the trimmed elements of a required comma-separated variable.
pub fn required_list<F>(lookup: &F, key: &str) -> Result<Vec<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    required_string(lookup, key)?
        .split(',')
        .map(|element| {
            let element = element.trim();
            if element.is_empty() {
                Err(ConfigError::EmptyElement(key.to_string()))
            } else {
                Ok(element.to_string())
            }
        })
        .collect()
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    };
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(n) => Ok(n),
    }
}
