use std::env;
use std::fmt;
use std::time::Duration;

use lesson_core::model::SectionType;

use crate::error::ConfigError;
use crate::lessons::{VerificationPolicy, VerifyStrategy};

pub const DEFAULT_BASE_URL: &str = "https://fastlearnersapp.com/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote lesson service.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Reads `FASTLEARNERS_API_BASE_URL`, `FASTLEARNERS_API_TOKEN` and
    /// `FASTLEARNERS_HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the timeout is not a positive
    /// integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            env::var("FASTLEARNERS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let mut config = Self::new(base_url);
        if let Ok(token) = env::var("FASTLEARNERS_API_TOKEN") {
            config = config.with_token(token);
        }
        if let Ok(raw) = env::var("FASTLEARNERS_HTTP_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "FASTLEARNERS_HTTP_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Joins a path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Verification policy with overrides from `FASTLEARNERS_VERIFY_CONCEPTS`
/// and `FASTLEARNERS_VERIFY_GENERAL_EXERCISES` (`remote` or `local`).
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for any other value.
pub fn verification_policy_from_env() -> Result<VerificationPolicy, ConfigError> {
    let mut policy = VerificationPolicy::default();
    for (var, section_type) in [
        ("FASTLEARNERS_VERIFY_CONCEPTS", SectionType::Concept),
        (
            "FASTLEARNERS_VERIFY_GENERAL_EXERCISES",
            SectionType::GeneralExercises,
        ),
    ] {
        if let Ok(raw) = env::var(var) {
            let strategy = raw
                .parse::<VerifyStrategy>()
                .map_err(|_| ConfigError::InvalidValue { var, value: raw })?;
            policy = policy.with(section_type, strategy);
        }
    }
    Ok(policy)
}
