//! # Digestion (dg-03)
//!
//! Turns finalized blocks into query-ready documents.
//!
//! ## Overview
//!
//! - **Batch Session**: one block → projected records → ordered bulk commit
//! - **Digestion Coordinator**: queue, single worker, retries, catch-up
//! - **Watermark**: last height committed contiguously
//!
//! ## Architecture
//!
//! ```text
//! Block Reader ──BlockData──→ Batch Session ──documents──→ Document Store (dg-01)
//!      ↑                          │
//!      │                          └── Projector Registry (dg-02)
//!      │
//! Digestion Coordinator ──watermark──→ Document Store (dg-01)
//!      │
//!      └── DigestFailure ──→ error channel
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - commit plan, batch session, errors
//! - `ports/` - the `BlockReader` trait
//! - `adapters/` - filesystem and in-memory block readers
//! - `service` - the coordinator
//!
//! ## Example
//!
//! ```rust,ignore
//! use dg_03_digestion::{DigestConfig, DigestCoordinator, FsBlockReader};
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let (failures_tx, mut failures_rx) = tokio::sync::mpsc::channel(100);
//!
//! let coordinator = DigestCoordinator::new(
//!     DigestConfig::default(),
//!     store,
//!     Arc::new(FsBlockReader::new("./blocks", "mitum")),
//!     Arc::new(ProjectorRegistry::standard()),
//!     Some(failures_tx),
//!     shutdown_rx,
//! );
//!
//! coordinator.catch_up(last_finalized).await?;
//! coordinator.start();
//! coordinator.digest(vec![handle])?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{FsBlockReader, InMemoryBlockReader};
pub use config::{ConfigError, DigestConfig, ReaderConfig};
pub use domain::{
    commit_order, digest_block, discard_height, BatchSession, CommitStep, DigestError,
    DigestFailure, SessionError, StepSource, COMMIT_PLAN,
};
pub use ports::{BlockReader, ReaderError, ReaderResult};
pub use service::{Activity, CoordinatorState, DigestCoordinator, HeightOutcome};
