//! OpenAI client construction.
//!
//! Every client is an explicit value built from a credential block. Nothing here
//! touches process-wide state, so two credential blocks with different keys can
//! be used side by side.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection details for one client handle.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions<'a> {
    pub api_key: &'a str,
    pub organization: Option<&'a str>,
    pub api_base: Option<&'a str>,
}

impl ClientOptions<'_> {
    fn to_config(self) -> OpenAIConfig {
        let mut config = OpenAIConfig::new().with_api_key(self.api_key);
        if let Some(org) = self.organization {
            config = config.with_org_id(org);
        }
        if let Some(base) = self.api_base {
            config = config.with_api_base(base.trim_end_matches('/'));
        }
        config
    }
}

/// Create an OpenAI client with the default timeout.
pub fn create_client(options: ClientOptions<'_>) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(options, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(
    options: ClientOptions<'_>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(options.to_config()).with_http_client(http_client))
}
