//! In-memory block reader for tests and embedding.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockData, Height};

use crate::ports::outbound::{BlockReader, ReaderError, ReaderResult};

#[derive(Debug, Default)]
pub struct InMemoryBlockReader {
    blocks: RwLock<HashMap<Height, BlockData>>,
}

impl InMemoryBlockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: impl IntoIterator<Item = BlockData>) -> Self {
        let reader = Self::new();
        for block in blocks {
            reader.insert(block);
        }
        reader
    }

    /// Make `block` readable at its height, replacing any previous one.
    pub fn insert(&self, block: BlockData) {
        self.blocks.write().insert(block.height(), block);
    }

    pub fn remove(&self, height: Height) -> Option<BlockData> {
        self.blocks.write().remove(&height)
    }
}

#[async_trait]
impl BlockReader for InMemoryBlockReader {
    async fn read_block_at(&self, height: Height) -> ReaderResult<BlockData> {
        self.blocks
            .read()
            .get(&height)
            .cloned()
            .ok_or(ReaderError::NotFound { height })
    }
}
