//! Blocks command implementation.

use super::open_store;
use crate::blocks::{load_block, save_block, Block};
use crate::cli::{BlocksAction, Output};
use crate::completion::CompletionModel;
use crate::config::Settings;
use crate::credentials::{is_env_reference, ApiKey, OpenAICredentials, REDACTED};
use crate::image::ImageModel;
use anyhow::{bail, Result};
use futures::future::try_join_all;
use serde_json::Value;

/// Block types managed by the CLI, with their display names.
const BLOCK_TYPES: [(&str, &str); 3] = [
    (OpenAICredentials::BLOCK_TYPE, OpenAICredentials::DISPLAY_NAME),
    (CompletionModel::BLOCK_TYPE, CompletionModel::DISPLAY_NAME),
    (ImageModel::BLOCK_TYPE, ImageModel::DISPLAY_NAME),
];

/// Run the blocks command.
pub async fn run_blocks(action: &BlocksAction, settings: &Settings) -> Result<()> {
    let store = open_store(settings);

    match action {
        BlocksAction::List { block_type } => {
            let types: Vec<&str> = match block_type {
                Some(t) => vec![check_type(t)?],
                None => BLOCK_TYPES.iter().map(|(slug, _)| *slug).collect(),
            };

            let listings =
                try_join_all(types.iter().map(|block_type| store.list(block_type))).await?;

            let mut total = 0;
            for (block_type, names) in types.into_iter().zip(listings) {
                if names.is_empty() {
                    continue;
                }
                Output::block_group(display_name(block_type), block_type, names.len());
                for name in &names {
                    Output::list_item(name);
                }
                total += names.len();
            }

            if total == 0 {
                Output::info("No blocks stored yet. Use 'openai-blocks init' or 'openai-blocks blocks credentials <name>'.");
            }
        }

        BlocksAction::Show { block_type, name } => {
            let block_type = check_type(block_type)?;
            let Some(document) = store.get(block_type, name).await? else {
                bail!("No {} block named '{}'", block_type, name);
            };

            Output::header(&format!("{} '{}'", display_name(block_type), name));
            let redacted = toml::Value::try_from(redact_secrets(document))?;
            println!("{}", toml::to_string_pretty(&redacted)?);
        }

        BlocksAction::Delete { block_type, name } => {
            let block_type = check_type(block_type)?;
            if store.delete(block_type, name).await? {
                Output::success(&format!("Deleted {} block '{}'", block_type, name));
            } else {
                Output::warning(&format!("No {} block named '{}'", block_type, name));
            }
        }

        BlocksAction::Credentials {
            name,
            api_key_env,
            organization,
            api_base,
        } => {
            let mut credentials = OpenAICredentials::new(ApiKey::from_env(api_key_env)?);
            if let Some(organization) = organization {
                credentials = credentials.with_organization(organization);
            }
            if let Some(api_base) = api_base {
                credentials = credentials.with_api_base(api_base);
            }

            save_block(store.as_ref(), name, &credentials).await?;
            Output::success(&format!(
                "Saved {} block '{}' (key read from ${})",
                OpenAICredentials::DISPLAY_NAME,
                name,
                api_key_env
            ));
        }

        BlocksAction::Completion {
            name,
            credentials,
            model,
            temperature,
            max_tokens,
            suffix,
            echo,
            timeout,
        } => {
            let credentials: OpenAICredentials = load_block(store.as_ref(), credentials).await?;

            let mut block = CompletionModel::new(credentials).with_echo(*echo);
            if let Some(model) = model {
                block = block.with_model(model);
            }
            if let Some(temperature) = temperature {
                block = block.with_temperature(*temperature);
            }
            if let Some(max_tokens) = max_tokens {
                block = block.with_max_tokens(*max_tokens);
            }
            if let Some(suffix) = suffix {
                block = block.with_suffix(suffix);
            }
            if let Some(timeout) = timeout {
                block = block.with_timeout(*timeout);
            }

            save_block(store.as_ref(), name, &block).await?;
            Output::success(&format!(
                "Saved {} block '{}' ({})",
                CompletionModel::DISPLAY_NAME,
                name,
                block.model
            ));
        }

        BlocksAction::Image {
            name,
            credentials,
            size,
            n,
            response_format,
        } => {
            let credentials: OpenAICredentials = load_block(store.as_ref(), credentials).await?;

            let mut block = ImageModel::new(credentials);
            if let Some(size) = size {
                block = block.with_size(*size);
            }
            if let Some(n) = n {
                block = block.with_n(*n);
            }
            if let Some(response_format) = response_format {
                block = block.with_response_format(*response_format);
            }

            save_block(store.as_ref(), name, &block).await?;
            Output::success(&format!(
                "Saved {} block '{}' ({} x {})",
                ImageModel::DISPLAY_NAME,
                name,
                block.n,
                block.size
            ));
        }
    }

    Ok(())
}

fn check_type(block_type: &str) -> Result<&'static str> {
    match BLOCK_TYPES.iter().find(|(slug, _)| *slug == block_type) {
        Some((slug, _)) => Ok(*slug),
        None => bail!(
            "Unknown block type '{}' (expected one of: {})",
            block_type,
            BLOCK_TYPES
                .iter()
                .map(|(slug, _)| *slug)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn display_name(block_type: &str) -> &'static str {
    BLOCK_TYPES
        .iter()
        .find(|(slug, _)| *slug == block_type)
        .map_or("Block", |(_, display)| *display)
}

/// Mask any `api_key` that is not an environment reference.
fn redact_secrets(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| match value {
                    Value::String(s) if key == "api_key" && !is_env_reference(&s) => {
                        (key, Value::String(REDACTED.to_string()))
                    }
                    other => (key, redact_secrets(other)),
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_nested_literal_keys() {
        let document = json!({
            "model": "text-curie-001",
            "openai_credentials": {"api_key": "sk-plain", "organization": "org"},
        });
        assert_eq!(
            redact_secrets(document),
            json!({
                "model": "text-curie-001",
                "openai_credentials": {"api_key": REDACTED, "organization": "org"},
            })
        );
    }

    #[test]
    fn test_env_references_are_shown() {
        let document = json!({"api_key": "${OPENAI_API_KEY}"});
        assert_eq!(redact_secrets(document.clone()), document);
    }

    #[test]
    fn test_literal_key_with_dollar_is_redacted() {
        let document = json!({"api_key": "sk-12$ab34"});
        assert_eq!(redact_secrets(document), json!({"api_key": REDACTED}));
    }

    #[test]
    fn test_check_type() {
        assert_eq!(check_type("openai-image-model").unwrap(), "openai-image-model");
        assert!(check_type("openai-audio").is_err());
        assert_eq!(display_name("openai-completion-model"), "OpenAI Completion Model");
    }
}
