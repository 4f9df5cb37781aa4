//! # Query Surface
//!
//! Read side of the digest: current-value lookups and paginated lists over
//! the digested collections, served as HAL JSON over HTTP.
//!
//! ## Request flow
//!
//! ```text
//! GET /nft/CA1/nfts?offset=10
//!        │
//!        ▼
//! ┌──────────────┐ hit  ┌───────────────┐
//! │ ResponseCache├─────►│  cached body  │
//! └──────┬───────┘      └───────────────┘
//!        │ miss
//!        ▼
//! ┌──────────────┐      ┌───────────────┐
//! │ SingleFlight ├─────►│ DigestQueries │──► DocumentStore
//! └──────────────┘      └───────────────┘
//! ```
//!
//! Concurrent requests for one URI share one store query; only the request
//! that ran it fills the cache. Lists page by an ordering field (`index`,
//! `nft_id`, `credential_id`) with at most [`MAX_PAGE_LIMIT`] entries.
//!
//! ## Example
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! dg_04_query_api::serve(ApiConfig::from_env(), store, rx).await?;
//! ```

pub mod domain;
pub mod metrics;
pub mod queries;
pub mod routes;
pub mod service;

pub use domain::{
    ApiConfig, ApiError, ConfigError, Hal, PageRequest, Problem, ResponseCache, SingleFlight,
    HAL_CONTENT_TYPE, MAX_PAGE_LIMIT, PROBLEM_CONTENT_TYPE,
};
pub use queries::DigestQueries;
pub use routes::{Lookup, LOOKUPS};
pub use service::{build_router, serve, AppState, ServerError};
