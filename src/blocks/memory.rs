//! In-memory block store.
//!
//! Holds blocks for the life of the process. Used by tests and by callers that
//! assemble blocks in code.

use super::BlockStore;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory block store.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get(&self, block_type: &str, name: &str) -> Result<Option<Value>> {
        let blocks = self.blocks.read().await;
        Ok(blocks
            .get(&(block_type.to_string(), name.to_string()))
            .cloned())
    }

    async fn put(&self, block_type: &str, name: &str, document: Value) -> Result<()> {
        let mut blocks = self.blocks.write().await;
        blocks.insert((block_type.to_string(), name.to_string()), document);
        Ok(())
    }

    async fn delete(&self, block_type: &str, name: &str) -> Result<bool> {
        let mut blocks = self.blocks.write().await;
        Ok(blocks
            .remove(&(block_type.to_string(), name.to_string()))
            .is_some())
    }

    async fn list(&self, block_type: &str) -> Result<Vec<String>> {
        let blocks = self.blocks.read().await;
        Ok(blocks
            .keys()
            .filter(|(t, _)| t == block_type)
            .map(|(_, name)| name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_is_scoped_and_sorted() {
        let store = MemoryBlockStore::new();
        store.put("a", "zeta", json!({})).await.unwrap();
        store.put("a", "alpha", json!({})).await.unwrap();
        store.put("b", "other", json!({})).await.unwrap();

        assert_eq!(store.list("a").await.unwrap(), vec!["alpha", "zeta"]);
        assert!(store.delete("a", "zeta").await.unwrap());
        assert!(!store.delete("a", "zeta").await.unwrap());
        assert_eq!(store.list("a").await.unwrap(), vec!["alpha"]);
    }
}
