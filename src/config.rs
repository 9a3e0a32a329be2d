use std::time::Duration;

use rocket::figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::AccessToken;

/// Configuration file read from the working directory.
pub const CONFIG_FILE: &str = "Portal.toml";
/// Prefix of environment variables overriding the file, e.g. `PORTAL_SERVICE_URL`.
pub const ENV_PREFIX: &str = "PORTAL_";

const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Portal configuration, derived from `Portal.toml` and `PORTAL_*`
/// environment variables.
#[derive(Debug, Deserialize)]
pub struct PortalConfig {
    // non-secrets
    service_url: String,
    #[serde(default = "default_request_timeout")]
    request_timeout: u64,
    // secrets
    #[serde(default)]
    access_token: Option<String>,
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

impl PortalConfig {
    /// The default provider chain: `Portal.toml`, then the environment.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the config from the default provider chain.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// Load the config from the default provider chain with the service URL
    /// overridden, e.g. from the command line.
    pub fn load_with_service_url(service_url: &str) -> Result<Self> {
        Self::from_figment(Self::figment().merge(Serialized::default("service_url", service_url)))
    }

    /// Extract and validate the config from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config = figment.extract::<Self>()?;
        if !(config.service_url.starts_with("http://") || config.service_url.starts_with("https://"))
        {
            return Err(Error::InvalidConfig(format!(
                "`service_url` must be an http(s) URL, got \"{}\"",
                config.service_url
            )));
        }
        if config.request_timeout == 0 {
            return Err(Error::InvalidConfig(
                "`request_timeout` must be at least one second".to_string(),
            ));
        }
        Ok(config)
    }

    /// Base URL of the external election service, without a trailing slash.
    pub fn service_url(&self) -> &str {
        self.service_url.trim_end_matches('/')
    }

    /// Time allowed for each request to the election service.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Default credential to present to the election service.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.access_token.clone().map(AccessToken::new)
    }
}
