//! HTTP service: router, middleware stack and the serve loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use dg_01_document_store::DocumentStore;
use thiserror::Error;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::cache::{cleanup_task, ResponseCache};
use crate::domain::config::{ApiConfig, ConfigError};
use crate::domain::errors::ApiError;
use crate::domain::hal::{Hal, HAL_CONTENT_TYPE};
use crate::domain::single_flight::SingleFlight;
use crate::metrics;
use crate::queries::DigestQueries;
use crate::routes::{serve_lookup, ListQuery, LOOKUPS};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid api config: {0}")]
    Config(#[from] ConfigError),

    #[error("api server io: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoded body and how long it may be cached.
#[derive(Clone)]
pub struct Encoded {
    pub body: Bytes,
    pub ttl: Duration,
}

/// What a query produces before encoding.
pub struct Reply {
    pub hal: Hal,
    pub ttl: Duration,
}

pub type Outcome = Result<Encoded, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub queries: DigestQueries,
    pub cache: Arc<ResponseCache>,
    pub flights: Arc<SingleFlight<Outcome>>,
}

impl AppState {
    pub fn new(queries: DigestQueries) -> Self {
        Self {
            queries,
            cache: Arc::new(ResponseCache::new()),
            flights: Arc::new(SingleFlight::new()),
        }
    }
}

fn cache_key(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn hal_response(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HAL_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Cache lookup, then a single-flight call of `query` keyed by the URI.
///
/// Only the caller that ran the query fills the cache.
pub async fn respond<F>(state: &AppState, uri: &Uri, query: F) -> Response
where
    F: Future<Output = Result<Reply, ApiError>> + Send + 'static,
{
    let key = cache_key(uri);
    if let Some(body) = state.cache.get(&key) {
        metrics::record_cache_hit();
        metrics::record_request(StatusCode::OK.as_u16());
        return hal_response(body);
    }

    let (outcome, shared) = state
        .flights
        .run(&key, async move {
            let reply = query.await?;
            let body = serde_json::to_vec(&reply.hal)
                .map_err(|e| ApiError::Internal(format!("encode response: {e}")))?;
            Ok(Encoded {
                body: Bytes::from(body),
                ttl: reply.ttl,
            })
        })
        .await;
    if shared {
        metrics::record_shared_call();
    }

    match outcome {
        Ok(encoded) => {
            if !shared {
                state.cache.put(key, encoded.body.clone(), encoded.ttl);
            }
            metrics::record_request(StatusCode::OK.as_u16());
            hal_response(encoded.body)
        }
        Err(e) => {
            metrics::record_request(e.status().as_u16());
            e.into_response()
        }
    }
}

/// `/`: digest progress, never cached.
async fn handle_status(State(state): State<AppState>) -> Response {
    match state.queries.watermark().await {
        Ok(watermark) => {
            let hal = Hal::new(serde_json::json!({ "watermark": watermark }), "/");
            match serde_json::to_vec(&hal) {
                Ok(body) => hal_response(Bytes::from(body)),
                Err(e) => ApiError::Internal(format!("encode response: {e}")).into_response(),
            }
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Router serving every endpoint for GET (and HEAD) and OPTIONS.
pub fn build_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new().route("/", get(handle_status).options(preflight));

    for lookup in LOOKUPS {
        let handler = move |State(state): State<AppState>,
                            OriginalUri(uri): OriginalUri,
                            Path(params): Path<HashMap<String, String>>,
                            Query(query): Query<ListQuery>| {
            serve_lookup(lookup, state, uri, params, query)
        };
        router = router.route(lookup.path, get(handler).options(preflight));
    }

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(config))
        .layer(TimeoutLayer::new(config.request_timeout()));

    router.layer(middleware).with_state(state)
}

/// Serve the query API until `shutdown` turns true.
pub async fn serve(
    config: ApiConfig,
    store: Arc<dyn DocumentStore>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    config.validate()?;

    let state = AppState::new(DigestQueries::new(store, config.max_page_limit));
    let cleanup = tokio::spawn(cleanup_task(
        state.cache.clone(),
        config.cache_cleanup_interval(),
        shutdown.clone(),
    ));

    let router = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(addr = %config.addr(), "[dg-04] query API listening");

    let mut stop = shutdown;
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|s| *s).await;
        })
        .await;

    cleanup.abort();
    info!("[dg-04] query API stopped");
    served.map_err(ServerError::from)
}
