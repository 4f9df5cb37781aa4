//! # RocksDB Document Store
//!
//! Persistent [`DocumentStore`] for single-node deployments.
//!
//! ## Layout
//!
//! - `documents` column family: key = `collection ++ 0x00 ++ seq (u64 BE)`,
//!   value = JSON document. Iterating a collection prefix yields documents in
//!   insertion order.
//! - `metadata` column family: the next sequence number.
//!
//! Filters are evaluated after a prefix scan with the same code the
//! in-memory store uses, so query semantics are identical across backends.
//! Each `insert_many` is one atomic `WriteBatch`.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

use super::lock::DataDirLock;
use crate::domain::document::{Document, Filter, FindOptions};
use crate::domain::errors::{StoreError, StoreResult};
use crate::ports::outbound::DocumentStore;

pub const CF_DOCUMENTS: &str = "documents";
pub const CF_METADATA: &str = "metadata";

const COLUMN_FAMILIES: &[&str] = &[CF_DOCUMENTS, CF_METADATA];
const SEQUENCE_KEY: &[u8] = b"next_sequence";

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 128MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// fsync after each write batch
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/digest".to_string(),
            block_cache_size: 128 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers, no fsync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

pub struct RocksDbDocumentStore {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
    next_seq: AtomicU64,
    _lock: DataDirLock,
}

impl RocksDbDocumentStore {
    /// Open or create the store, taking the data directory lock.
    pub fn open(config: RocksDbConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.path)
            .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", config.path)))?;
        let lock = DataDirLock::acquire(Path::new(&config.path))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| StoreError::Unavailable(format!("failed to open RocksDB: {e}")))?;

        let next_seq = {
            let meta = db
                .cf_handle(CF_METADATA)
                .ok_or_else(|| StoreError::Unavailable("missing metadata column family".into()))?;
            match db
                .get_cf(meta, SEQUENCE_KEY)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
            {
                Some(bytes) if bytes.len() == 8 => {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(&bytes);
                    u64::from_be_bytes(buf)
                }
                _ => 0,
            }
        };

        tracing::info!(path = %config.path, next_seq, "RocksDB document store opened");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config,
            next_seq: AtomicU64::new(next_seq),
            _lock: lock,
        })
    }

    fn write_options(&self) -> rocksdb::WriteOptions {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

fn collection_prefix(collection: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(collection.len() + 1);
    prefix.extend_from_slice(collection.as_bytes());
    prefix.push(0);
    prefix
}

fn document_key(collection: &str, seq: u64) -> Vec<u8> {
    let mut key = collection_prefix(collection);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn scan(db: &DB, collection: &str) -> StoreResult<Vec<(Vec<u8>, Document)>> {
    let cf = db
        .cf_handle(CF_DOCUMENTS)
        .ok_or_else(|| StoreError::Unavailable("missing documents column family".into()))?;
    let prefix = collection_prefix(collection);
    let mut out = Vec::new();

    for item in db.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward)) {
        let (key, value) = item.map_err(|e| StoreError::backend(collection, e.to_string()))?;
        if !key.starts_with(&prefix) {
            break;
        }
        let doc: Document =
            serde_json::from_slice(&value).map_err(|e| StoreError::serialization(collection, e))?;
        out.push((key.to_vec(), doc));
    }

    Ok(out)
}

#[async_trait]
impl DocumentStore for RocksDbDocumentStore {
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64> {
        let db = self.db.write();
        let docs_cf = db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StoreError::Unavailable("missing documents column family".into()))?;
        let meta_cf = db
            .cf_handle(CF_METADATA)
            .ok_or_else(|| StoreError::Unavailable("missing metadata column family".into()))?;

        let count = documents.len() as u64;
        let first = self.next_seq.load(Ordering::SeqCst);
        let mut batch = WriteBatch::default();
        for (offset, doc) in documents.iter().enumerate() {
            let bytes =
                serde_json::to_vec(doc).map_err(|e| StoreError::serialization(collection, e))?;
            batch.put_cf(docs_cf, document_key(collection, first + offset as u64), bytes);
        }
        batch.put_cf(meta_cf, SEQUENCE_KEY, (first + count).to_be_bytes());

        db.write_opt(batch, &self.write_options())
            .map_err(|e| StoreError::backend(collection, format!("batch write failed: {e}")))?;
        self.next_seq.store(first + count, Ordering::SeqCst);

        Ok(count)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let db = self.db.write();
        let docs_cf = db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StoreError::Unavailable("missing documents column family".into()))?;

        let mut batch = WriteBatch::default();
        let mut removed = 0u64;
        for (key, doc) in scan(&db, collection)? {
            if filter.matches(&doc) {
                batch.delete_cf(docs_cf, key);
                removed += 1;
            }
        }

        if removed > 0 {
            db.write_opt(batch, &self.write_options())
                .map_err(|e| StoreError::backend(collection, format!("delete failed: {e}")))?;
        }
        Ok(removed)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: Document,
    ) -> StoreResult<()> {
        let db = self.db.write();
        let docs_cf = db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| StoreError::Unavailable("missing documents column family".into()))?;
        let meta_cf = db
            .cf_handle(CF_METADATA)
            .ok_or_else(|| StoreError::Unavailable("missing metadata column family".into()))?;

        let mut batch = WriteBatch::default();
        for (key, doc) in scan(&db, collection)? {
            if filter.matches(&doc) {
                batch.delete_cf(docs_cf, key);
            }
        }

        let seq = self.next_seq.load(Ordering::SeqCst);
        let bytes =
            serde_json::to_vec(&document).map_err(|e| StoreError::serialization(collection, e))?;
        batch.put_cf(docs_cf, document_key(collection, seq), bytes);
        batch.put_cf(meta_cf, SEQUENCE_KEY, (seq + 1).to_be_bytes());

        db.write_opt(batch, &self.write_options())
            .map_err(|e| StoreError::backend(collection, format!("replace failed: {e}")))?;
        self.next_seq.store(seq + 1, Ordering::SeqCst);
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let db = self.db.read();
        let matched = scan(&db, collection)?
            .into_iter()
            .map(|(_, doc)| doc)
            .filter(|doc| filter.matches(doc))
            .collect();
        Ok(options.apply(matched))
    }
}
