//! # Query API Metrics
//!
//! Enable with the `metrics` feature.
//!
//! - `digest_api_requests_total` - Counter of answered requests (by status)
//! - `digest_api_cache_hits_total` - Counter of responses served from cache
//! - `digest_api_shared_calls_total` - Counter of requests that joined an in-flight call

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref API_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "digest_api_requests_total",
        "Total number of answered query requests",
        &["status"]
    )
    .expect("Failed to create API_REQUESTS metric");

    pub static ref CACHE_HITS: IntCounter = register_int_counter!(
        "digest_api_cache_hits_total",
        "Total number of responses served from the response cache"
    )
    .expect("Failed to create CACHE_HITS metric");

    pub static ref SHARED_CALLS: IntCounter = register_int_counter!(
        "digest_api_shared_calls_total",
        "Total number of requests answered by another request's query"
    )
    .expect("Failed to create SHARED_CALLS metric");
}

#[cfg(feature = "metrics")]
pub fn record_request(status: u16) {
    API_REQUESTS.with_label_values(&[&status.to_string()]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_cache_hit() {
    CACHE_HITS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_shared_call() {
    SHARED_CALLS.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_request(_status: u16) {}

#[cfg(not(feature = "metrics"))]
pub fn record_cache_hit() {}

#[cfg(not(feature = "metrics"))]
pub fn record_shared_call() {}
