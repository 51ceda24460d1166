//! Connection settings for the provisioning backend.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Validated connection settings for the provisioning backend.
///
/// All instances must be constructed via [`BackendConfig::builder`] so
/// invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
    api_user: String,
    api_password: String,
    request_timeout: Duration,
}

impl BackendConfig {
    /// Returns a builder to incrementally construct and validate a
    /// configuration.
    pub fn builder() -> BackendConfigBuilder {
        BackendConfigBuilder::default()
    }

    /// Full backend URL (including scheme).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Backend username for Basic auth.
    pub fn api_user(&self) -> &str {
        &self.api_user
    }

    /// Backend password for Basic auth.
    pub fn api_password(&self) -> &str {
        &self.api_password
    }

    /// Per-request timeout applied to the RPC client.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.base_url)?;
        ensure_not_empty(&self.api_user, "api_user")?;
        ensure_not_empty(&self.api_password, "api_password")?;

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct BackendConfigBuilder {
    base_url: Option<String>,
    api_user: Option<String>,
    api_password: Option<String>,
    request_timeout: Option<Duration>,
}

impl BackendConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_user(mut self, user: impl Into<String>) -> Self {
        self.api_user = Some(user.into());
        self
    }

    pub fn api_password(mut self, password: impl Into<String>) -> Self {
        self.api_password = Some(password.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<BackendConfig> {
        let config = BackendConfig {
            base_url: trimmed_string(self.base_url.context("base_url is required")?),
            api_user: trimmed_string(self.api_user.context("api_user is required")?),
            api_password: trimmed_string(self.api_password.context("api_password is required")?),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        };

        config.validate()?;
        Ok(config)
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("base_url must start with http:// or https://");
    }
    Ok(())
}
