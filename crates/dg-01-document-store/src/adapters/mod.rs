//! Store adapters.
//!
//! - `memory`: process-local store used by tests and ephemeral nodes
//! - `rocksdb`: persistent store (`rocksdb` feature)
//! - `lock`: exclusive flock on the RocksDB data directory

#[cfg(feature = "rocksdb")]
pub mod lock;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;
