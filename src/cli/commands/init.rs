//! Init command - first-run setup.

use super::open_store;
use crate::blocks::{save_block, Block};
use crate::cli::Output;
use crate::completion::CompletionModel;
use crate::config::Settings;
use crate::credentials::{ApiKey, OpenAICredentials};
use console::style;
use std::path::PathBuf;

const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Run the init command.
pub async fn run_init(settings: &Settings, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    Output::header("openai-blocks setup");
    println!();

    // Step 1: Configuration file
    println!("{}", style("Step 1: Configuration").bold().cyan());
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        Output::info(&format!("Using existing config at {}", config_path.display()));
    } else {
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config at {}", config_path.display()));
    }

    let data_dir = settings.data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        Output::success(&format!("Created data directory: {}", data_dir.display()));
    }
    println!();

    // Step 2: Default blocks
    println!("{}", style("Step 2: Default blocks").bold().cyan());
    if std::env::var(API_KEY_ENV).map_or(true, |key| key.is_empty()) {
        Output::warning(&format!("{} is not set; skipping default blocks.", API_KEY_ENV));
        println!("  Get your API key from: {}", style("https://platform.openai.com/api-keys").underlined());
        println!("  {}", style(format!("export {}='sk-...'", API_KEY_ENV)).green());
        println!("  Then run 'openai-blocks init' again.");
        return Ok(());
    }

    let store = open_store(settings);
    let block_name = settings.interpret.block.as_str();

    if store.get(OpenAICredentials::BLOCK_TYPE, block_name).await?.is_some() {
        Output::info(&format!("Credentials block '{}' already exists", block_name));
    } else {
        let credentials = OpenAICredentials::new(ApiKey::from_env(API_KEY_ENV)?);
        save_block(store.as_ref(), block_name, &credentials).await?;
        Output::success(&format!(
            "Created credentials block '{}' (key read from ${})",
            block_name, API_KEY_ENV
        ));
    }

    if store.get(CompletionModel::BLOCK_TYPE, block_name).await?.is_some() {
        Output::info(&format!("Completion block '{}' already exists", block_name));
    } else {
        let credentials = OpenAICredentials::new(ApiKey::from_env(API_KEY_ENV)?);
        let model = CompletionModel::new(credentials)
            .with_model("gpt-3.5-turbo-instruct")
            .with_max_tokens(256);
        save_block(store.as_ref(), block_name, &model).await?;
        Output::success(&format!("Created completion block '{}'", block_name));
    }

    println!();
    Output::info(&format!("Blocks are stored in {}", settings.blocks_path().display()));
    Output::info("Try: openai-blocks explain -- ls /does-not-exist");

    Ok(())
}
