//! Image command implementation.

use super::open_store;
use crate::blocks::load_block;
use crate::cli::{to_overrides, Output};
use crate::config::Settings;
use crate::image::{ImageModel, ImageSize};
use anyhow::Result;
use async_openai::types::Image;
use serde_json::{json, Value};

/// Run the image command.
pub async fn run_image(
    block: &str,
    prompt: &str,
    size: Option<ImageSize>,
    n: Option<u8>,
    params: &[(String, Value)],
    settings: &Settings,
) -> Result<()> {
    let store = open_store(settings);
    let model: ImageModel = load_block(store.as_ref(), block).await?;

    let mut overrides = to_overrides(params);
    if let Some(size) = size {
        overrides.insert("size".to_string(), json!(size));
    }
    if let Some(n) = n {
        overrides.insert("n".to_string(), json!(n));
    }

    let spinner = Output::spinner("Generating images...");

    match model.submit_prompt(prompt, &overrides).await {
        Ok(response) => {
            spinner.finish_and_clear();
            Output::header(&format!("Images ({})", response.data.len()));

            for image in &response.data {
                match &**image {
                    Image::Url { url, .. } => Output::list_item(url),
                    Image::B64Json { b64_json, .. } => {
                        Output::list_item(&format!("<base64, {} bytes>", b64_json.len()))
                    }
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Image generation failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
