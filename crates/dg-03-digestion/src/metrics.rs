//! # Digestion Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! dg-03-digestion = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `digest_blocks_digested_total` - Counter of committed heights
//! - `digest_blocks_skipped_total` - Counter of heights found already digested
//! - `digest_failures_total` - Counter of heights given up on
//! - `digest_retries_total` - Counter of retried attempts
//! - `digest_documents_written_total` - Counter of documents written (by collection)
//! - `digest_watermark_height` - Gauge of the persisted watermark

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref BLOCKS_DIGESTED: IntCounter = register_int_counter!(
        "digest_blocks_digested_total",
        "Total number of heights committed"
    )
    .expect("Failed to create BLOCKS_DIGESTED metric");

    pub static ref BLOCKS_SKIPPED: IntCounter = register_int_counter!(
        "digest_blocks_skipped_total",
        "Total number of heights skipped because they were already digested"
    )
    .expect("Failed to create BLOCKS_SKIPPED metric");

    pub static ref DIGEST_FAILURES: IntCounter = register_int_counter!(
        "digest_failures_total",
        "Total number of heights that exhausted their retries"
    )
    .expect("Failed to create DIGEST_FAILURES metric");

    pub static ref DIGEST_RETRIES: IntCounter = register_int_counter!(
        "digest_retries_total",
        "Total number of retried digestion attempts"
    )
    .expect("Failed to create DIGEST_RETRIES metric");

    /// Documents written, labeled by collection
    pub static ref DOCUMENTS_WRITTEN: IntCounterVec = register_int_counter_vec!(
        "digest_documents_written_total",
        "Total number of documents written",
        &["collection"]
    )
    .expect("Failed to create DOCUMENTS_WRITTEN metric");

    pub static ref WATERMARK_HEIGHT: IntGauge = register_int_gauge!(
        "digest_watermark_height",
        "Last digested height"
    )
    .expect("Failed to create WATERMARK_HEIGHT metric");
}

#[cfg(feature = "metrics")]
pub fn record_block_digested() {
    BLOCKS_DIGESTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_block_skipped() {
    BLOCKS_SKIPPED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_digest_failure() {
    DIGEST_FAILURES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_retry() {
    DIGEST_RETRIES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_documents_written(collection: &str, count: u64) {
    DOCUMENTS_WRITTEN.with_label_values(&[collection]).inc_by(count);
}

#[cfg(feature = "metrics")]
pub fn set_watermark(height: u64) {
    WATERMARK_HEIGHT.set(height as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_block_digested() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_skipped() {}

#[cfg(not(feature = "metrics"))]
pub fn record_digest_failure() {}

#[cfg(not(feature = "metrics"))]
pub fn record_retry() {}

#[cfg(not(feature = "metrics"))]
pub fn record_documents_written(_collection: &str, _count: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn set_watermark(_height: u64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable_without_feature() {
        record_block_digested();
        record_block_skipped();
        record_digest_failure();
        record_retry();
        record_documents_written("digest_bm", 1);
        set_watermark(42);
    }
}
