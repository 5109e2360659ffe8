//! Configuration settings for openai-blocks.

use crate::interpret::DEFAULT_PROMPT_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub blocks: BlockSettings,
    pub interpret: InterpretSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.openai-blocks".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Named block storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSettings {
    /// Path to the TOML file holding named blocks.
    pub path: String,
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self {
            path: "~/.openai-blocks/blocks.toml".to_string(),
        }
    }
}

/// Defaults for error interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretSettings {
    /// Completion block used to explain errors.
    pub block: String,
    /// Text placed before the fenced error in the prompt.
    pub prompt_prefix: String,
    /// Number of trailing traceback lines included in the prompt.
    pub traceback_tail: usize,
}

impl Default for InterpretSettings {
    fn default() -> Self {
        Self {
            block: "default".to_string(),
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            traceback_tail: 0,
        }
    }
}

impl Settings {
    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("openai-blocks")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded blocks file path.
    pub fn blocks_path(&self) -> PathBuf {
        Self::expand_path(&self.blocks.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str("[interpret]\ntraceback_tail = 3\n").unwrap();
        assert_eq!(settings.interpret.traceback_tail, 3);
        assert_eq!(settings.interpret.prompt_prefix, "Explain:");
        assert_eq!(settings.interpret.block, "default");
        assert_eq!(settings.general.log_level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let mut settings = Settings::default();
        settings.blocks.path = "/tmp/blocks.toml".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.blocks_path(), PathBuf::from("/tmp/blocks.toml"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.interpret.traceback_tail, 0);
    }
}
