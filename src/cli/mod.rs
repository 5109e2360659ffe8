//! CLI module for openai-blocks.

pub mod commands;
mod output;

pub use output::Output;

use crate::completion::Overrides;
use crate::image::{ImageResponseFormat, ImageSize};
use clap::{Parser, Subcommand};
use serde_json::Value;

/// openai-blocks - named OpenAI blocks and error interpretation
///
/// Store OpenAI credentials and request parameters as named blocks, submit
/// prompts with them, and have failing commands explained by a completion model.
#[derive(Parser, Debug)]
#[command(name = "openai-blocks")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default configuration and create default blocks
    Init,

    /// Manage named blocks
    Blocks {
        #[command(subcommand)]
        action: BlocksAction,
    },

    /// Submit a prompt to a completion block
    Complete {
        /// Completion block name
        block: String,

        /// The prompt to complete
        prompt: String,

        /// Override the block's temperature
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Override the block's max tokens
        #[arg(short, long)]
        max_tokens: Option<u32>,

        /// Extra request parameter (key=value, value parsed as JSON when possible)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Generate images with an image block
    Image {
        /// Image block name
        block: String,

        /// The image prompt
        prompt: String,

        /// Override the block's image size
        #[arg(short, long)]
        size: Option<ImageSize>,

        /// Override the number of images
        #[arg(short, long)]
        n: Option<u8>,

        /// Extra request parameter (key=value, value parsed as JSON when possible)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Run a command and explain its failure with a completion block
    Explain {
        /// Completion block name (default: interpret.block from config)
        #[arg(short, long)]
        block: Option<String>,

        /// Prompt prefix (default: interpret.prompt_prefix from config)
        #[arg(long)]
        prefix: Option<String>,

        /// Number of trailing stderr lines to include in the prompt
        #[arg(long)]
        tail: Option<usize>,

        /// The command to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlocksAction {
    /// List stored blocks
    List {
        /// Only list blocks of this type
        #[arg(short = 't', long = "type")]
        block_type: Option<String>,
    },

    /// Show a stored block with secrets redacted
    Show {
        /// Block type (openai-credentials, openai-completion-model, openai-image-model)
        block_type: String,
        /// Block name
        name: String,
    },

    /// Delete a stored block
    Delete {
        /// Block type
        block_type: String,
        /// Block name
        name: String,
    },

    /// Create or replace a credentials block
    Credentials {
        /// Block name
        name: String,

        /// Environment variable holding the API key
        #[arg(long, default_value = "OPENAI_API_KEY")]
        api_key_env: String,

        /// OpenAI organization
        #[arg(long)]
        organization: Option<String>,

        /// Alternative API base URL
        #[arg(long)]
        api_base: Option<String>,
    },

    /// Create or replace a completion model block
    Completion {
        /// Block name
        name: String,

        /// Credentials block to embed
        #[arg(long, default_value = "default")]
        credentials: String,

        /// Model ID
        #[arg(long)]
        model: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Suffix after the completion
        #[arg(long)]
        suffix: Option<String>,

        /// Echo the prompt back
        #[arg(long)]
        echo: bool,

        /// HTTP timeout in seconds
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Create or replace an image model block
    Image {
        /// Block name
        name: String,

        /// Credentials block to embed
        #[arg(long, default_value = "default")]
        credentials: String,

        /// Image size
        #[arg(long)]
        size: Option<ImageSize>,

        /// Number of images
        #[arg(long)]
        n: Option<u8>,

        /// Response format (url, b64_json)
        #[arg(long)]
        response_format: Option<ImageResponseFormat>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Parse a `key=value` request parameter.
pub fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Empty parameter name in '{}'", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect parameters into request overrides. Later keys win.
pub fn to_overrides(params: &[(String, Value)]) -> Overrides {
    params.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert_eq!(
            parse_param("user=alice").unwrap(),
            ("user".to_string(), json!("alice"))
        );
        assert_eq!(
            parse_param("stop=[\"\\n\"]").unwrap(),
            ("stop".to_string(), json!(["\n"]))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_explain_takes_trailing_command() {
        let cli = Cli::parse_from(["openai-blocks", "explain", "--tail", "2", "ls", "-la", "/nope"]);
        match cli.command {
            Commands::Explain { tail, command, .. } => {
                assert_eq!(tail, Some(2));
                assert_eq!(command, vec!["ls", "-la", "/nope"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_complete_params() {
        let cli = Cli::parse_from([
            "openai-blocks",
            "complete",
            "default",
            "hello",
            "-p",
            "echo=true",
            "--temperature",
            "0.2",
        ]);
        match cli.command {
            Commands::Complete {
                temperature, params, ..
            } => {
                assert_eq!(temperature, Some(0.2));
                assert_eq!(to_overrides(&params).get("echo"), Some(&json!(true)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
