//! Adapter settings.
//!
//! Settings are layered with the `config` crate: an optional TOML document
//! supplied by the host, overridden by `VIDOOMY__*` environment variables.
//! Every field has a default, so an empty document yields the production
//! endpoint and the current response policy.

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{
    BIDDER_CODE, ENDPOINT, ENVIRONMENT_VARIABLE_PREFIX, ENVIRONMENT_VARIABLE_SEPARATOR,
};
use crate::error::AdapterError;

/// How exchange responses are turned into bids.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePolicy {
    /// Pass the body through unchanged when it carries a `requestId`.
    Legacy,
    /// Map `dealId` to the request id and wire outstream renderers.
    #[default]
    Current,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Settings {
    /// Bidder code reported to the orchestrator and used as log prefix.
    #[serde(default = "default_bidder_code")]
    #[validate(length(min = 1))]
    pub bidder_code: String,

    /// Exchange endpoint; the query string is appended after `?`.
    #[serde(default = "default_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    #[serde(default)]
    pub response_policy: ResponsePolicy,
}

fn default_bidder_code() -> String {
    BIDDER_CODE.to_string()
}

fn default_endpoint() -> String {
    ENDPOINT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bidder_code: default_bidder_code(),
            endpoint: default_endpoint(),
            response_policy: ResponsePolicy::default(),
        }
    }
}

impl Settings {
    /// Build settings from environment overrides only.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when an override cannot be
    /// deserialized or the result fails validation.
    pub fn from_env() -> Result<Self, Report<AdapterError>> {
        Self::from_toml("")
    }

    /// Build settings from a TOML document layered under environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when the TOML is invalid, a
    /// value has the wrong type, or the result fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<AdapterError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(AdapterError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(AdapterError::Configuration {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings
            .validate()
            .change_context(AdapterError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        log::debug!(
            "{}: settings loaded (endpoint={}, policy={:?})",
            settings.bidder_code,
            settings.endpoint,
            settings.response_policy
        );

        Ok(settings)
    }
}
