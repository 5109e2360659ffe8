//! Image generation block.
//!
//! Learn more in the OpenAI image generation guide:
//! <https://platform.openai.com/docs/guides/images>

use crate::blocks::Block;
use crate::completion::Overrides;
use crate::credentials::OpenAICredentials;
use crate::error::{BlocksError, Result};
use async_openai::types::{CreateImageRequest, ImagesResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

/// Size of the generated images.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "256x256")]
    S256x256,
    #[serde(rename = "512x512")]
    S512x512,
    #[serde(rename = "1024x1024")]
    S1024x1024,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::S256x256 => "256x256",
            ImageSize::S512x512 => "512x512",
            ImageSize::S1024x1024 => "1024x1024",
        }
    }
}

impl std::str::FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "256x256" | "256" => Ok(ImageSize::S256x256),
            "512x512" | "512" => Ok(ImageSize::S512x512),
            "1024x1024" | "1024" => Ok(ImageSize::S1024x1024),
            _ => Err(format!(
                "Unknown image size: {} (expected 256x256, 512x512 or 1024x1024)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format the generated images are returned in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageResponseFormat {
    #[default]
    Url,
    B64Json,
}

impl std::str::FromStr for ImageResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "url" => Ok(ImageResponseFormat::Url),
            "b64_json" | "b64" => Ok(ImageResponseFormat::B64Json),
            _ => Err(format!("Unknown response format: {}", s)),
        }
    }
}

impl std::fmt::Display for ImageResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageResponseFormat::Url => write!(f, "url"),
            ImageResponseFormat::B64Json => write!(f, "b64_json"),
        }
    }
}

/// Config for an OpenAI image model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageModel {
    /// The credentials used to authenticate with OpenAI.
    pub openai_credentials: OpenAICredentials,
    /// The size of the images to generate.
    #[serde(default)]
    pub size: ImageSize,
    /// The number of images to generate.
    #[serde(default = "default_n")]
    pub n: u8,
    /// The format of the generated images.
    #[serde(default)]
    pub response_format: ImageResponseFormat,
}

fn default_n() -> u8 {
    1
}

impl Block for ImageModel {
    const BLOCK_TYPE: &'static str = "openai-image-model";
    const DISPLAY_NAME: &'static str = "OpenAI Image Model";
}

impl ImageModel {
    pub fn new(openai_credentials: OpenAICredentials) -> Self {
        Self {
            openai_credentials,
            size: ImageSize::default(),
            n: default_n(),
            response_format: ImageResponseFormat::default(),
        }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_n(mut self, n: u8) -> Self {
        self.n = n;
        self
    }

    pub fn with_response_format(mut self, response_format: ImageResponseFormat) -> Self {
        self.response_format = response_format;
        self
    }

    /// Stored defaults with `overrides` applied on top.
    pub fn request_parameters(&self, overrides: &Overrides) -> Overrides {
        let mut params = Map::new();
        params.insert("size".to_string(), json!(self.size));
        params.insert("n".to_string(), json!(self.n));
        params.insert("response_format".to_string(), json!(self.response_format));

        params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }

    /// Submit a prompt for the model to generate images.
    ///
    /// Extra request fields can be passed in `overrides`, see
    /// <https://platform.openai.com/docs/api-reference/images/create>.
    #[instrument(skip(self, prompt, overrides), fields(size = %self.size, n = self.n))]
    pub async fn submit_prompt(&self, prompt: &str, overrides: &Overrides) -> Result<ImagesResponse> {
        let client = self.openai_credentials.get_client()?;

        let mut params = self.request_parameters(overrides);
        let n = params.get("n").cloned().unwrap_or(Value::Null);
        let size = params.get("size").cloned().unwrap_or(Value::Null);

        params.insert("prompt".to_string(), Value::String(prompt.to_string()));
        let request: CreateImageRequest = serde_json::from_value(Value::Object(params))
            .map_err(|e| BlocksError::InvalidRequest(e.to_string()))?;

        let creation = client.images().create(request).await?;
        info!("Finished image completion, creating {} {} image(s).", n, size);
        Ok(creation)
    }
}
