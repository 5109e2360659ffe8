//! Named blocks: persisted bundles of configuration resolvable by name.
//!
//! A block type is any serde type implementing [`Block`]. Stores only see JSON
//! documents keyed by `(block type slug, block name)`; typed access goes through
//! [`load_block`] and [`save_block`].

mod file;
mod memory;

pub use file::FileBlockStore;
pub use memory::MemoryBlockStore;

use crate::credentials::REDACTED;
use crate::error::{BlocksError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

/// A configuration type that can be stored and loaded by name.
pub trait Block: Serialize + DeserializeOwned + Send + Sync {
    /// Slug used as the storage namespace, e.g. `openai-credentials`.
    const BLOCK_TYPE: &'static str;
    /// Human readable name.
    const DISPLAY_NAME: &'static str;
}

/// Trait for named block storage backends.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Fetch a block document.
    async fn get(&self, block_type: &str, name: &str) -> Result<Option<Value>>;

    /// Insert or replace a block document.
    async fn put(&self, block_type: &str, name: &str, document: Value) -> Result<()>;

    /// Delete a block document. Returns whether it existed.
    async fn delete(&self, block_type: &str, name: &str) -> Result<bool>;

    /// List block names of one type, sorted.
    async fn list(&self, block_type: &str) -> Result<Vec<String>>;
}

/// Load and deserialize a named block.
pub async fn load_block<B: Block>(store: &dyn BlockStore, name: &str) -> Result<B> {
    debug!("Loading {} block '{}'", B::BLOCK_TYPE, name);

    let document = store
        .get(B::BLOCK_TYPE, name)
        .await?
        .ok_or_else(|| BlocksError::not_found(B::BLOCK_TYPE, name))?;

    serde_json::from_value(document).map_err(|e| BlocksError::invalid(B::BLOCK_TYPE, name, e))
}

/// Serialize and save a block under `name`, replacing any previous block.
pub async fn save_block<B: Block>(store: &dyn BlockStore, name: &str, block: &B) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BlocksError::invalid(B::BLOCK_TYPE, name, "block name is empty"));
    }

    let document = strip_nulls(serde_json::to_value(block)?);
    if contains_redacted(&document) {
        return Err(BlocksError::invalid(
            B::BLOCK_TYPE,
            name,
            "API key has no environment reference and would be stored redacted; create it with ApiKey::from_env",
        ));
    }
    store.put(B::BLOCK_TYPE, name, document).await?;

    debug!("Saved {} block '{}'", B::BLOCK_TYPE, name);
    Ok(())
}

fn contains_redacted(value: &Value) -> bool {
    match value {
        Value::String(s) => s == REDACTED,
        Value::Object(map) => map.values().any(contains_redacted),
        Value::Array(items) => items.iter().any(contains_redacted),
        _ => false,
    }
}

/// Drop `null` members recursively. TOML has no null.
pub(crate) fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
