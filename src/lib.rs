//! openai-blocks - named OpenAI blocks and error interpretation
//!
//! Thin configuration objects ("blocks") bundle OpenAI credentials and request
//! parameters so they can be stored and loaded by name, plus an interpreter that
//! explains a failing function's error with a language model.
//!
//! # Architecture
//!
//! - `credentials` - API key and organization, producing explicit client handles
//! - `completion` - text completion block
//! - `image` - image generation block
//! - `blocks` - the `Block` trait and named block stores (memory, TOML file)
//! - `interpret` - the error interpreter and the `Reconstruct` contract
//! - `workflow` - plain functions versus orchestrated flows and tasks
//! - `config` - configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use openai_blocks::blocks::{load_block, FileBlockStore};
//! use openai_blocks::completion::{CompletionModel, Overrides};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = FileBlockStore::new("blocks.toml");
//!     let model: CompletionModel = load_block(&store, "default").await?;
//!
//!     let completion = model.submit_prompt("what is the meaning of life?", &Overrides::new()).await?;
//!     println!("{}", completion.choices[0].text);
//!
//!     Ok(())
//! }
//! ```

pub mod blocks;
pub mod cli;
pub mod completion;
pub mod config;
pub mod credentials;
pub mod error;
pub mod image;
pub mod interpret;
pub mod openai;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use error::{BlocksError, Result};
