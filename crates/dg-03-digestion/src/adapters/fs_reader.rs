//! Filesystem block reader.
//!
//! One JSON document per height, `{root}/{height}.json`, as written by the
//! node's block exporter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared_types::{BlockData, Height};
use tracing::debug;

use crate::ports::outbound::{BlockReader, ReaderError, ReaderResult};

#[derive(Debug, Clone)]
pub struct FsBlockReader {
    root: PathBuf,
    network_id: String,
}

impl FsBlockReader {
    pub fn new(root: impl Into<PathBuf>, network_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            network_id: network_id.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, height: Height) -> PathBuf {
        self.root.join(format!("{height}.json"))
    }
}

#[async_trait]
impl BlockReader for FsBlockReader {
    async fn read_block_at(&self, height: Height) -> ReaderResult<BlockData> {
        let path = self.path_for(height);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ReaderError::NotFound { height });
            }
            Err(source) => return Err(ReaderError::Io { height, source }),
        };

        let block: BlockData = serde_json::from_slice(&bytes)
            .map_err(|source| ReaderError::Decode { height, source })?;

        if block.network_id != self.network_id {
            return Err(ReaderError::Invalid {
                height,
                reason: format!(
                    "network id {:?} does not match {:?}",
                    block.network_id, self.network_id
                ),
            });
        }

        if block.height() != height {
            return Err(ReaderError::Invalid {
                height,
                reason: format!("file describes height {}", block.height()),
            });
        }

        debug!(height = %height, path = %path.display(), "block read");
        Ok(block)
    }
}
