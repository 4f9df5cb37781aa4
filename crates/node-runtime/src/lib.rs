//! # Digest Node
//!
//! Wires the pipeline together for the `digest-node` binary:
//!
//! ```text
//!  {height}.json exports ──► ExportFollower ──► DigestCoordinator ──► DocumentStore
//!                                                                         │
//!                                            query API (dg-04) ◄──────────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `DG_` environment variables and validate it
//! 2. Open the document store (memory or RocksDB)
//! 3. Catch up from the watermark to the last contiguous export
//! 4. Start the coordinator worker and the export follower
//! 5. Serve the query API
//!
//! Modules:
//! - `config/` - per-stage configuration
//! - `store/` - backend selection
//! - `follower/` - export directory tracking
//! - `runtime/` - lifecycle of the node

pub mod config;
pub mod follower;
pub mod runtime;
pub mod store;

pub use config::{ConfigError, FollowConfig, NodeConfig, StoreBackend, StoreConfig};
pub use follower::ExportFollower;
pub use runtime::{DigestNode, NodeError};
