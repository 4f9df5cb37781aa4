//! # Document Store (dg-01)
//!
//! Persistence boundary of the digest service. Everything the pipeline writes
//! and everything the query API reads goes through the [`DocumentStore`] port.
//!
//! ## Model
//!
//! - Documents are JSON objects grouped into named collections.
//! - Writes are bulk inserts and filtered deletes. There are no
//!   cross-collection transactions; callers order their writes.
//! - Reads are filtered finds with optional sort and limit.
//!
//! ## Collections
//!
//! Collection names are a wire contract with existing deployments; see
//! [`collections`].
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - documents, filters, find options, errors
//! - `ports/` - the `DocumentStore` trait and the per-session `StoreHandle`
//! - `adapters/` - in-memory store, RocksDB store (`rocksdb` feature)
//! - `watermark` - persisted "last digested height"
//!
//! ## Usage
//!
//! ```ignore
//! use dg_01_document_store::{collections, Filter, FindOptions, InMemoryDocumentStore};
//!
//! let store = InMemoryDocumentStore::new();
//! store.insert_many(collections::TOKEN, docs).await?;
//! let latest = store
//!     .find_one(collections::TOKEN, &Filter::eq("contract", "CA1"), &FindOptions::latest())
//!     .await?;
//! ```

pub mod adapters;
pub mod collections;
pub mod domain;
pub mod ports;
pub mod watermark;

pub use adapters::memory::InMemoryDocumentStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb::{RocksDbConfig, RocksDbDocumentStore};
pub use domain::document::{decode, encode, Document, Filter, FindOptions, SortOrder};
pub use domain::errors::{StoreError, StoreResult};
pub use ports::outbound::{DocumentStore, HandleLease, StoreHandle};
pub use watermark::WatermarkStore;
