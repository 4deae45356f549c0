//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Request handlers never read process-wide environment variables, which keeps behaviour
//! consistent in multi-threaded runtimes and test harnesses.

use crate::constants::{
    DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL, DEFAULT_PORT, DEFAULT_PROVIDER_TIMEOUT_SECS,
};
use crate::error::{ConfigError, ConfigResult};
use quickcode_types::NonEmptyText;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const GEMINI_MODEL_VAR: &str = "GEMINI_MODEL";
pub const GEMINI_API_BASE_VAR: &str = "GEMINI_API_BASE";
pub const PORT_VAR: &str = "PORT";
pub const PROVIDER_TIMEOUT_VAR: &str = "PROVIDER_TIMEOUT_SECS";
pub const CONFLICT_RULES_VAR: &str = "QUICKCODE_CONFLICT_RULES";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    api_key: NonEmptyText,
    model: NonEmptyText,
    api_base: String,
    provider_timeout: Duration,
    port: u16,
    conflict_rules_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default model, endpoint, timeout and port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `api_key` is absent or blank. The provider
    /// credential is required before anything is served.
    pub fn new(api_key: Option<String>) -> ConfigResult<Self> {
        let api_key = api_key
            .and_then(|key| NonEmptyText::new(key).ok())
            .ok_or(ConfigError::Missing(GEMINI_API_KEY_VAR))?;

        Ok(Self {
            api_key,
            model: NonEmptyText::new(DEFAULT_GEMINI_MODEL)
                .map_err(|_| ConfigError::Missing(GEMINI_MODEL_VAR))?,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            port: DEFAULT_PORT,
            conflict_rules_path: None,
        })
    }

    /// Resolve the full configuration from process environment variables.
    ///
    /// Intended to be called exactly once, from a binary's `main`.
    pub fn from_env() -> ConfigResult<Self> {
        let var = |name: &str| std::env::var(name).ok();

        let mut cfg = Self::new(var(GEMINI_API_KEY_VAR))?;
        if let Some(model) = non_blank(var(GEMINI_MODEL_VAR)) {
            cfg = cfg.with_model(&model)?;
        }
        if let Some(base) = non_blank(var(GEMINI_API_BASE_VAR)) {
            cfg = cfg.with_api_base(base);
        }
        let port = port_from_env_value(var(PORT_VAR))?;
        let timeout = timeout_from_env_value(var(PROVIDER_TIMEOUT_VAR))?;
        let rules_path = conflict_rules_path_from_env_value(var(CONFLICT_RULES_VAR));

        Ok(cfg
            .with_port(port)
            .with_provider_timeout(timeout)
            .with_conflict_rules_path(rules_path))
    }

    pub fn with_model(mut self, model: &str) -> ConfigResult<Self> {
        self.model = NonEmptyText::new(model).map_err(|e| ConfigError::Invalid {
            name: GEMINI_MODEL_VAR,
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_conflict_rules_path(mut self, path: Option<PathBuf>) -> Self {
        self.conflict_rules_path = path;
        self
    }

    pub fn api_key(&self) -> &str {
        self.api_key.as_str()
    }

    pub fn model(&self) -> &str {
        self.model.as_str()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn provider_timeout(&self) -> Duration {
        self.provider_timeout
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn conflict_rules_path(&self) -> Option<&Path> {
        self.conflict_rules_path.as_deref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the listen port from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PORT`].
pub fn port_from_env_value(value: Option<String>) -> ConfigResult<u16> {
    match non_blank(value) {
        None => Ok(DEFAULT_PORT),
        Some(v) => v.parse::<u16>().map_err(|e| ConfigError::Invalid {
            name: PORT_VAR,
            reason: e.to_string(),
        }),
    }
}

/// Path of the conflict rule file, if one is configured.
pub fn conflict_rules_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}

/// Parse the provider timeout (whole seconds) from an optional string value.
pub fn timeout_from_env_value(value: Option<String>) -> ConfigResult<Duration> {
    let secs = match non_blank(value) {
        None => DEFAULT_PROVIDER_TIMEOUT_SECS,
        Some(v) => v.parse::<u64>().map_err(|e| ConfigError::Invalid {
            name: PROVIDER_TIMEOUT_VAR,
            reason: e.to_string(),
        })?,
    };
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name: PROVIDER_TIMEOUT_VAR,
            reason: "timeout must be at least one second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}
