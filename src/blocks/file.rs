//! TOML file block store.
//!
//! Blocks live in a single document laid out as `[<block-type>.<name>]`:
//!
//! ```toml
//! [openai-credentials.default]
//! api_key = "${OPENAI_API_KEY}"
//!
//! [openai-completion-model.explainer]
//! model = "gpt-3.5-turbo-instruct"
//! max_tokens = 256
//!
//! [openai-completion-model.explainer.openai_credentials]
//! api_key = "${OPENAI_API_KEY}"
//! ```
//!
//! The file is re-read on every lookup so edits made by hand are picked up.

use super::{strip_nulls, BlockStore};
use crate::error::{BlocksError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Block store backed by one TOML file.
pub struct FileBlockStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBlockStore {
    /// Open a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_table(&self) -> Result<toml::Table> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_table(&self, table: &toml::Table) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(table)?;
        let tmp_path = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl BlockStore for FileBlockStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self, block_type: &str, name: &str) -> Result<Option<Value>> {
        let table = self.read_table().await?;

        match table.get(block_type).and_then(|t| t.get(name)) {
            Some(block) => Ok(Some(serde_json::to_value(block)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, block_type: &str, name: &str, document: Value) -> Result<()> {
        let block = toml::Value::try_from(strip_nulls(document))
            .map_err(|e| BlocksError::invalid(block_type, name, e))?;
        if !block.is_table() {
            return Err(BlocksError::invalid(block_type, name, "a block must be a table"));
        }

        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table().await?;

        let section = table
            .entry(block_type.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        let section = section.as_table_mut().ok_or_else(|| {
            BlocksError::Config(format!(
                "'{}' in {} is not a table",
                block_type,
                self.path.display()
            ))
        })?;
        section.insert(name.to_string(), block);

        self.write_table(&table).await?;
        debug!("Wrote {} block '{}' to {}", block_type, name, self.path.display());
        Ok(())
    }

    async fn delete(&self, block_type: &str, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table().await?;

        let removed = table
            .get_mut(block_type)
            .and_then(|section| section.as_table_mut())
            .and_then(|section| section.remove(name))
            .is_some();

        if removed {
            self.write_table(&table).await?;
        }
        Ok(removed)
    }

    async fn list(&self, block_type: &str) -> Result<Vec<String>> {
        let table = self.read_table().await?;

        let mut names: Vec<String> = table
            .get(block_type)
            .and_then(|section| section.as_table())
            .map(|section| section.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{load_block, save_block};
    use crate::completion::CompletionModel;
    use crate::credentials::{ApiKey, OpenAICredentials};
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlockStore::new(dir.path().join("blocks.toml"));

        assert!(store.get("any", "thing").await.unwrap().is_none());
        assert!(store.list("any").await.unwrap().is_empty());
        assert!(!store.delete("any", "thing").await.unwrap());
    }

    #[tokio::test]
    async fn test_completion_block_round_trip() {
        std::env::set_var("OPENAI_BLOCKS_TEST_KEY_FILE", "sk-file");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("blocks.toml");
        let store = FileBlockStore::new(&path);

        let credentials =
            OpenAICredentials::new(ApiKey::from_env("OPENAI_BLOCKS_TEST_KEY_FILE").unwrap());
        let model = CompletionModel::new(credentials).with_max_tokens(64);
        save_block(&store, "explainer", &model).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[openai-completion-model.explainer]"));
        assert!(content.contains("${OPENAI_BLOCKS_TEST_KEY_FILE}"));
        assert!(!content.contains("sk-file"));

        let loaded: CompletionModel = load_block(&store, "explainer").await.unwrap();
        assert_eq!(loaded.max_tokens, 64);
        assert_eq!(loaded.model, "text-curie-001");
        assert_eq!(loaded.openai_credentials.api_key.expose(), "sk-file");
    }

    #[tokio::test]
    async fn test_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.toml");
        std::fs::write(
            &path,
            "[greeting.b]\ntext = \"bee\"\n\n[greeting.a]\ntext = \"ay\"\n",
        )
        .unwrap();
        let store = FileBlockStore::new(&path);

        assert_eq!(store.list("greeting").await.unwrap(), vec!["a", "b"]);
        assert_eq!(
            store.get("greeting", "b").await.unwrap(),
            Some(json!({"text": "bee"}))
        );

        assert!(store.delete("greeting", "b").await.unwrap());
        assert_eq!(store.list("greeting").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_non_table_document_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlockStore::new(dir.path().join("blocks.toml"));
        let result = store.put("greeting", "x", json!("just a string")).await;
        assert!(matches!(result, Err(BlocksError::InvalidBlock { .. })));
    }
}
