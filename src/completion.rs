//! Text completion block.
//!
//! Learn more in the OpenAI text completion guide:
//! <https://platform.openai.com/docs/guides/completion>

use crate::blocks::Block;
use crate::credentials::OpenAICredentials;
use crate::error::{BlocksError, Result};
use async_openai::types::{CreateCompletionRequest, CreateCompletionResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Per-call request parameters, merged over a block's stored defaults.
pub type Overrides = Map<String, Value>;

/// Config for an OpenAI completion model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionModel {
    /// The credentials used to authenticate with OpenAI.
    pub openai_credentials: OpenAICredentials,
    /// ID of the model to use.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum number of tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Suffix that comes after the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Echo back the prompt in addition to the completion.
    #[serde(default)]
    pub echo: bool,
    /// HTTP timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

fn default_model() -> String {
    "text-curie-001".to_string()
}

fn default_temperature() -> f64 {
    0.5
}

fn default_max_tokens() -> u32 {
    16
}

impl Block for CompletionModel {
    const BLOCK_TYPE: &'static str = "openai-completion-model";
    const DISPLAY_NAME: &'static str = "OpenAI Completion Model";
}

impl CompletionModel {
    /// Create a completion model with default parameters.
    pub fn new(openai_credentials: OpenAICredentials) -> Self {
        Self {
            openai_credentials,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            suffix: None,
            echo: false,
            timeout: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Stored defaults with `overrides` applied on top. The block is not modified.
    pub fn request_parameters(&self, overrides: &Overrides) -> Overrides {
        let mut params = Map::new();
        params.insert("model".to_string(), json!(self.model));
        params.insert("temperature".to_string(), json!(self.temperature));
        params.insert("max_tokens".to_string(), json!(self.max_tokens));
        params.insert("suffix".to_string(), json!(self.suffix));
        params.insert("echo".to_string(), json!(self.echo));
        params.insert("timeout".to_string(), json!(self.timeout));

        params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }

    /// Submit a prompt for the model to complete.
    ///
    /// OpenAI may return several choices; the first is what it considers the best.
    /// Extra request fields can be passed in `overrides`, see
    /// <https://platform.openai.com/docs/api-reference/completions/create>.
    #[instrument(skip(self, prompt, overrides), fields(model = %self.model))]
    pub async fn submit_prompt(
        &self,
        prompt: &str,
        overrides: &Overrides,
    ) -> Result<CreateCompletionResponse> {
        let mut params = self.request_parameters(overrides);

        let timeout = params
            .remove("timeout")
            .map(|value| parse_timeout(&value))
            .transpose()?
            .flatten();
        let client = match timeout {
            Some(timeout) => self.openai_credentials.get_client_with_timeout(timeout)?,
            None => self.openai_credentials.get_client()?,
        };

        params.insert("prompt".to_string(), Value::String(prompt.to_string()));
        let request: CreateCompletionRequest = serde_json::from_value(Value::Object(params))
            .map_err(|e| BlocksError::InvalidRequest(e.to_string()))?;
        let model = request.model.clone();

        debug!("Requesting completion for a {} character prompt", prompt.len());
        let creation = client.completions().create(request).await?;

        let total_tokens = creation.usage.as_ref().map_or(0, |u| u.total_tokens);
        info!(
            "Finished text completion using the {:?} model with {} tokens, creating {} choice(s).",
            model,
            total_tokens,
            creation.choices.len()
        );
        Ok(creation)
    }
}

/// Seconds as a JSON number, or null for no timeout.
fn parse_timeout(value: &Value) -> Result<Option<Duration>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_f64() {
            Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
            _ => Err(BlocksError::InvalidRequest(format!(
                "timeout must be a positive number of seconds, got {}",
                n
            ))),
        },
        other => Err(BlocksError::InvalidRequest(format!(
            "timeout must be a number of seconds, got {}",
            other
        ))),
    }
}
