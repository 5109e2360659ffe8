//! OpenAI credential block.

use crate::blocks::Block;
use crate::error::{BlocksError, Result};
use crate::openai::{create_client, create_client_with_timeout, ClientOptions};
use async_openai::{config::OpenAIConfig, Client};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Placeholder written in place of a key that has no environment reference.
pub const REDACTED: &str = "**********";

fn env_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$(\{[A-Za-z_][A-Za-z0-9_]*\}|[A-Za-z_][A-Za-z0-9_]*)$").expect("Invalid regex")
    })
}

/// Whether `raw` is exactly one `${VAR}` or `$VAR` reference.
pub(crate) fn is_env_reference(raw: &str) -> bool {
    env_reference_pattern().is_match(raw)
}

/// An API key that never leaves the process in cleartext.
///
/// A key read from `${VAR}` remembers the reference and serializes back to it.
/// A key given directly serializes as [`REDACTED`], so only env-sourced keys can
/// be saved in a block.
#[derive(Clone)]
pub struct ApiKey {
    secret: SecretString,
    reference: Option<String>,
}

impl ApiKey {
    /// Wrap a literal key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(key.into()),
            reference: None,
        }
    }

    /// Resolve a key from an environment variable, keeping `${var}` as its reference.
    pub fn from_env(var: &str) -> Result<Self> {
        Self::parse(&format!("${{{}}}", var))
    }

    /// Parse a stored value. A whole-value `${VAR}` or `$VAR` is expanded; anything
    /// else is a literal key.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw == REDACTED {
            return Err(BlocksError::Config(
                "API key was stored redacted; store an environment reference such as ${OPENAI_API_KEY}"
                    .to_string(),
            ));
        }

        if !is_env_reference(raw) {
            return Ok(Self::new(raw));
        }

        let expanded = shellexpand::env(raw)
            .map_err(|e| BlocksError::Config(format!("Cannot resolve API key: {}", e)))?;

        Ok(Self {
            secret: SecretString::from(expanded.into_owned()),
            reference: Some(raw.to_string()),
        })
    }

    /// The environment reference this key was loaded from, if any.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Expose the key for building a client.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "ApiKey({})", reference),
            None => write!(f, "ApiKey({})", REDACTED),
        }
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.reference.as_deref().unwrap_or(REDACTED))
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ApiKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Credentials used to authenticate with OpenAI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICredentials {
    /// The API key used to authenticate with OpenAI.
    pub api_key: ApiKey,
    /// Organization used for API requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Alternative API base URL (proxies, compatible servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Block for OpenAICredentials {
    const BLOCK_TYPE: &'static str = "openai-credentials";
    const DISPLAY_NAME: &'static str = "OpenAI Credentials";
}

impl OpenAICredentials {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            organization: None,
            api_base: None,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Build a client handle for these credentials. No request is sent.
    pub fn get_client(&self) -> Result<Client<OpenAIConfig>> {
        create_client(self.client_options()?)
    }

    /// Build a client handle whose HTTP requests time out after `timeout`.
    pub fn get_client_with_timeout(&self, timeout: Duration) -> Result<Client<OpenAIConfig>> {
        create_client_with_timeout(self.client_options()?, timeout)
    }

    fn client_options(&self) -> Result<ClientOptions<'_>> {
        if self.api_key.expose().is_empty() {
            return Err(BlocksError::Config("OpenAI API key is empty".to_string()));
        }
        if let Some(base) = &self.api_base {
            Url::parse(base)
                .map_err(|e| BlocksError::Config(format!("Invalid api_base '{}': {}", base, e)))?;
        }

        Ok(ClientOptions {
            api_key: self.api_key.expose(),
            organization: self.organization.as_deref(),
            api_base: self.api_base.as_deref(),
        })
    }
}
