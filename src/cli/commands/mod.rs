//! CLI command implementations.

mod blocks;
mod complete;
mod config;
mod explain;
mod image;
mod init;

pub use blocks::run_blocks;
pub use complete::run_complete;
pub use config::run_config;
pub use explain::{run_explain, CommandFailure};
pub use image::run_image;
pub use init::run_init;

use crate::blocks::{BlockStore, FileBlockStore};
use crate::config::Settings;
use std::sync::Arc;

/// Open the block store configured in `settings`.
pub(crate) fn open_store(settings: &Settings) -> Arc<dyn BlockStore> {
    Arc::new(FileBlockStore::new(settings.blocks_path()))
}
