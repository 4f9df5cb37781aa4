//! HTTP contract of the query API, driven through the router in-process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use dg_01_document_store::{
    collections, Document, DocumentStore, Filter, FindOptions, InMemoryDocumentStore, StoreResult,
    WatermarkStore,
};
use dg_04_query_api::{
    build_router, ApiConfig, AppState, DigestQueries, HAL_CONTENT_TYPE, PROBLEM_CONTENT_TYPE,
};
use serde_json::{json, Value};
use shared_types::Height;
use tokio::sync::Semaphore;
use tower::ServiceExt;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn app(store: Arc<dyn DocumentStore>) -> Router {
    let config = ApiConfig::default();
    let state = AppState::new(DigestQueries::new(store, config.max_page_limit));
    build_router(state, &config)
}

struct Answer {
    status: StatusCode,
    content_type: Option<String>,
    body: Value,
}

async fn send(app: &Router, method: Method, uri: &str) -> Answer {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Answer {
        status,
        content_type,
        body,
    }
}

async fn get(app: &Router, uri: &str) -> Answer {
    send(app, Method::GET, uri).await
}

fn nft_ids(answer: &Answer) -> Vec<u64> {
    answer.body["_embedded"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["nft_id"].as_u64().unwrap())
        .collect()
}

fn href<'a>(answer: &'a Answer, rel: &str) -> Option<&'a str> {
    answer.body["_links"][rel]["href"].as_str()
}

async fn seeded_nfts() -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    let mut docs: Vec<Document> = (0..70u64)
        .map(|id| doc(json!({"contract": "CA1", "nft_id": id, "height": 1, "active": true})))
        .collect();
    docs.push(doc(json!({"contract": "CA2", "nft_id": 0, "height": 1, "active": true})));
    store.insert_many(collections::NFT, docs).await.unwrap();
    store
}

/// Counts `find` calls and holds each one until a permit is granted.
struct GatedStore {
    inner: InMemoryDocumentStore,
    finds: AtomicUsize,
    gate: Semaphore,
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64> {
        self.inner.insert_many(collection, documents).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.inner.delete_many(collection, filter).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: Document,
    ) -> StoreResult<()> {
        self.inner.replace_one(collection, filter, document).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.find(collection, filter, options).await
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

#[tokio::test]
async fn test_first_page_is_fifty_ascending() {
    let app = app(seeded_nfts().await);

    let page = get(&app, "/nft/CA1/nfts").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.content_type.as_deref(), Some(HAL_CONTENT_TYPE));
    assert_eq!(nft_ids(&page), (0..50).collect::<Vec<_>>());
    assert_eq!(href(&page, "self"), Some("/nft/CA1/nfts"));
    assert_eq!(href(&page, "next"), Some("/nft/CA1/nfts?offset=49"));
    assert_eq!(href(&page, "reverse"), Some("/nft/CA1/nfts?reverse=true"));
}

#[tokio::test]
async fn test_next_links_walk_to_the_end() {
    let app = app(seeded_nfts().await);

    let second = get(&app, "/nft/CA1/nfts?offset=49").await;
    assert_eq!(nft_ids(&second), (50..70).collect::<Vec<_>>());
    assert_eq!(href(&second, "self"), Some("/nft/CA1/nfts?offset=49"));
    assert_eq!(href(&second, "next"), Some("/nft/CA1/nfts?offset=69"));

    let past_end = get(&app, "/nft/CA1/nfts?offset=69").await;
    assert_eq!(past_end.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reverse_page_is_top_fifty_descending() {
    let app = app(seeded_nfts().await);

    let page = get(&app, "/nft/CA1/nfts?reverse=true").await;
    assert_eq!(nft_ids(&page), (20..70).rev().collect::<Vec<_>>());
    assert_eq!(href(&page, "next"), Some("/nft/CA1/nfts?offset=20&reverse=true"));
    assert_eq!(href(&page, "reverse"), Some("/nft/CA1/nfts?reverse=false"));

    let below = get(&app, "/nft/CA1/nfts?offset=20&reverse=1").await;
    assert_eq!(nft_ids(&below), (0..20).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_limit_is_clamped_and_defaulted() {
    let app = app(seeded_nfts().await);

    assert_eq!(nft_ids(&get(&app, "/nft/CA1/nfts?limit=1000").await).len(), 50);
    assert_eq!(nft_ids(&get(&app, "/nft/CA1/nfts?limit=5").await), vec![0, 1, 2, 3, 4]);
    assert_eq!(nft_ids(&get(&app, "/nft/CA1/nfts?limit=-3").await).len(), 50);
    assert_eq!(nft_ids(&get(&app, "/nft/CA1/nfts?limit=many").await).len(), 50);
}

#[tokio::test]
async fn test_list_scoped_to_path_identity() {
    let app = app(seeded_nfts().await);
    let page = get(&app, "/nft/CA2/nfts").await;
    assert_eq!(nft_ids(&page), vec![0]);
    assert!(page.body["_embedded"][0]["contract"] == "CA2");
}

#[tokio::test]
async fn test_block_operations_ordered_by_index() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let ops = [2u64, 0, 1]
        .iter()
        .map(|i| doc(json!({"fact_hash": format!("F{i}"), "height": 3, "index": i})))
        .chain(std::iter::once(doc(json!({"fact_hash": "G", "height": 4, "index": 0}))))
        .collect();
    store.insert_many(collections::OPERATION, ops).await.unwrap();
    let app = app(store);

    let page = get(&app, "/block/3/operations").await;
    let hashes: Vec<_> = page.body["_embedded"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["fact_hash"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(hashes, vec!["F0", "F1", "F2"]);
    assert_eq!(href(&page, "next"), Some("/block/3/operations?offset=2"));
}

// =============================================================================
// CURRENT VALUES
// =============================================================================

#[tokio::test]
async fn test_current_value_is_highest_height() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let docs = [10, 30, 20]
        .into_iter()
        .map(|h| doc(json!({"contract": "CA1", "height": h, "symbol": format!("T{h}")})))
        .collect();
    store.insert_many(collections::TOKEN, docs).await.unwrap();
    let app = app(store);

    let token = get(&app, "/token/CA1").await;
    assert_eq!(token.status, StatusCode::OK);
    assert_eq!(token.body["_embedded"]["symbol"], "T30");
    assert_eq!(href(&token, "self"), Some("/token/CA1"));
}

#[tokio::test]
async fn test_timestamp_service_and_item_share_a_collection() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let docs = vec![
        doc(json!({"contract": "CA1", "is_item": false, "height": 2, "projects": ["P"]})),
        doc(json!({"contract": "CA1", "is_item": true, "project": "P", "timestamp_idx": 0, "height": 3})),
    ];
    store.insert_many(collections::TIMESTAMP, docs).await.unwrap();
    let app = app(store);

    let service = get(&app, "/timestamp/CA1/service").await;
    assert_eq!(service.body["_embedded"]["is_item"], false);

    let item = get(&app, "/timestamp/CA1/project/P/id/0").await;
    assert_eq!(item.body["_embedded"]["height"], 3);
}

#[tokio::test]
async fn test_status_reports_watermark_uncached() {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let app = app(store.clone());

    let before = get(&app, "/").await;
    assert_eq!(before.status, StatusCode::OK);
    assert_eq!(before.body["_embedded"]["watermark"], Value::Null);

    WatermarkStore::new(store).save(Height(7)).await.unwrap();
    let after = get(&app, "/").await;
    assert_eq!(after.body["_embedded"]["watermark"], 7);
}

// =============================================================================
// ERRORS AND METHODS
// =============================================================================

#[tokio::test]
async fn test_missing_record_is_problem_404() {
    let app = app(Arc::new(InMemoryDocumentStore::new()));

    let answer = get(&app, "/token/CA9").await;
    assert_eq!(answer.status, StatusCode::NOT_FOUND);
    assert_eq!(answer.content_type.as_deref(), Some(PROBLEM_CONTENT_TYPE));
    assert_eq!(answer.body["status"], 404);
    assert_eq!(answer.body["detail"], "token design not found");
    assert!(answer.body["type"].is_string());
    assert!(answer.body["title"].is_string());
}

#[tokio::test]
async fn test_bad_params_are_problem_400() {
    let app = app(seeded_nfts().await);

    for uri in ["/nft/CA1/nft/007", "/block/abc", "/token/%20", "/nft/CA1/nfts?offset=01"] {
        let answer = get(&app, uri).await;
        assert_eq!(answer.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(answer.content_type.as_deref(), Some(PROBLEM_CONTENT_TYPE), "{uri}");
        assert_eq!(answer.body["status"], 400, "{uri}");
    }

    assert_eq!(get(&app, "/nft/CA1/nft/7").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_only_get_and_options_allowed() {
    let app = app(seeded_nfts().await);

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        let answer = send(&app, method.clone(), "/nft/CA1/nfts").await;
        assert_eq!(answer.status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
    }

    assert!(send(&app, Method::OPTIONS, "/nft/CA1/nfts").await.status.is_success());
    assert_eq!(send(&app, Method::HEAD, "/nft/CA1/nft/3").await.status, StatusCode::OK);
}

// =============================================================================
// CACHE AND SINGLE-FLIGHT
// =============================================================================

#[tokio::test]
async fn test_cached_response_served_until_ttl() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store
        .insert_many(
            collections::TOKEN,
            vec![doc(json!({"contract": "CA1", "height": 10}))],
        )
        .await
        .unwrap();
    let app = app(store.clone());

    assert_eq!(get(&app, "/token/CA1").await.body["_embedded"]["height"], 10);

    store
        .insert_many(
            collections::TOKEN,
            vec![doc(json!({"contract": "CA1", "height": 20}))],
        )
        .await
        .unwrap();

    // Same URI inside the 500ms TTL: cached body.
    assert_eq!(get(&app, "/token/CA1").await.body["_embedded"]["height"], 10);
    // Another URI is another cache key.
    assert_eq!(get(&app, "/token/CA1?fresh=1").await.body["_embedded"]["height"], 20);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(get(&app, "/token/CA1").await.body["_embedded"]["height"], 20);
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let app = app(store.clone());

    assert_eq!(get(&app, "/account/A1").await.status, StatusCode::NOT_FOUND);
    store
        .insert_many(
            collections::ACCOUNT,
            vec![doc(json!({"address": "A1", "height": 1}))],
        )
        .await
        .unwrap();
    assert_eq!(get(&app, "/account/A1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_query() {
    let store = Arc::new(GatedStore {
        inner: InMemoryDocumentStore::new(),
        finds: AtomicUsize::new(0),
        gate: Semaphore::new(0),
    });
    store
        .inner
        .insert_many(
            collections::TOKEN,
            vec![doc(json!({"contract": "CA1", "height": 5}))],
        )
        .await
        .unwrap();
    let app = app(store.clone());

    let first = tokio::spawn({
        let app = app.clone();
        async move { get(&app, "/token/CA1").await }
    });
    while store.finds.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    let second = tokio::spawn({
        let app = app.clone();
        async move { get(&app, "/token/CA1").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    store.gate.add_permits(10);
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
    assert_eq!(store.finds.load(Ordering::SeqCst), 1);
}
