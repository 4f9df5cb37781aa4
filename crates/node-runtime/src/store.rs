//! Document store selection.

use std::sync::Arc;

use dg_01_document_store::{DocumentStore, InMemoryDocumentStore, StoreError};
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};

/// Open the configured backend.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory document store; digested records are lost on exit");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        StoreBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    use dg_01_document_store::{RocksDbConfig, RocksDbDocumentStore};

    let rocks = RocksDbConfig {
        path: config.path.to_string_lossy().into_owned(),
        ..RocksDbConfig::default()
    };
    info!(path = %rocks.path, "Opening RocksDB document store");
    Ok(Arc::new(RocksDbDocumentStore::open(rocks)?))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    Err(StoreError::Unavailable(
        "built without the rocksdb feature".to_string(),
    ))
}
