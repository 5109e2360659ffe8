//! Complete command implementation.

use super::open_store;
use crate::blocks::load_block;
use crate::cli::{to_overrides, Output};
use crate::completion::CompletionModel;
use crate::config::Settings;
use anyhow::Result;
use serde_json::{json, Value};

/// Run the complete command.
pub async fn run_complete(
    block: &str,
    prompt: &str,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    params: &[(String, Value)],
    settings: &Settings,
) -> Result<()> {
    let store = open_store(settings);
    let model: CompletionModel = load_block(store.as_ref(), block).await?;

    let mut overrides = to_overrides(params);
    if let Some(temperature) = temperature {
        overrides.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = max_tokens {
        overrides.insert("max_tokens".to_string(), json!(max_tokens));
    }

    let spinner = Output::spinner(&format!("Completing with {}...", model.model));

    match model.submit_prompt(prompt, &overrides).await {
        Ok(response) => {
            spinner.finish_and_clear();

            for choice in &response.choices {
                if response.choices.len() > 1 {
                    Output::header(&format!("Choice {}", choice.index));
                }
                println!("{}", choice.text.trim());
            }

            if let Some(usage) = &response.usage {
                println!();
                Output::kv("Model", &response.model);
                Output::kv("Total tokens", &usage.total_tokens.to_string());
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Completion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
