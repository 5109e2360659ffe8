//! Configuration module for openai-blocks.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{BlockSettings, GeneralSettings, InterpretSettings, Settings};
