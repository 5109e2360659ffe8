//! openai-blocks CLI entry point.

use anyhow::Result;
use clap::Parser;
use openai_blocks::cli::{commands, Cli, Commands};
use openai_blocks::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("openai_blocks={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings, config_path).await?;
        }

        Commands::Blocks { action } => {
            commands::run_blocks(action, &settings).await?;
        }

        Commands::Complete {
            block,
            prompt,
            temperature,
            max_tokens,
            params,
        } => {
            commands::run_complete(block, prompt, *temperature, *max_tokens, params, &settings)
                .await?;
        }

        Commands::Image {
            block,
            prompt,
            size,
            n,
            params,
        } => {
            commands::run_image(block, prompt, *size, *n, params, &settings).await?;
        }

        Commands::Explain {
            block,
            prefix,
            tail,
            command,
        } => {
            let code = commands::run_explain(block.clone(), prefix.clone(), *tail, command, &settings)?;
            if code != 0 {
                std::process::exit(code);
            }
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
