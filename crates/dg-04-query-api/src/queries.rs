//! Store-level queries behind every endpoint.
//!
//! Records are append-only facts stamped with a height, so the current
//! value of an identity is the entry with the greatest height.

use std::sync::Arc;

use dg_01_document_store::{
    Document, DocumentStore, Filter, FindOptions, StoreResult, WatermarkStore,
};
use shared_types::Height;

use crate::domain::page::PageRequest;

#[derive(Clone)]
pub struct DigestQueries {
    store: Arc<dyn DocumentStore>,
    watermark: WatermarkStore,
    max_page_limit: i64,
}

impl DigestQueries {
    pub fn new(store: Arc<dyn DocumentStore>, max_page_limit: i64) -> Self {
        Self {
            watermark: WatermarkStore::new(store.clone()),
            store,
            max_page_limit,
        }
    }

    /// Highest-height entry matching `filter`.
    pub async fn current(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        self.store
            .find_one(collection, filter, &FindOptions::latest())
            .await
    }

    /// One page of `collection` ordered by `ordering_field`.
    pub async fn list(
        &self,
        collection: &str,
        base: Filter,
        ordering_field: &str,
        page: &PageRequest,
    ) -> StoreResult<Vec<Document>> {
        let filter = page.filter(base, ordering_field);
        let options = page.options(ordering_field, self.max_page_limit);
        self.store.find(collection, &filter, &options).await
    }

    /// Page size `page` resolves to.
    pub fn page_limit(&self, page: &PageRequest) -> usize {
        page.effective_limit(self.max_page_limit)
    }

    pub async fn watermark(&self) -> StoreResult<Option<Height>> {
        self.watermark.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_01_document_store::{collections, InMemoryDocumentStore};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    async fn seeded() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        let docs = [10, 20, 30]
            .into_iter()
            .map(|h| doc(json!({"contract": "CA1", "height": h, "symbol": format!("T{h}")})))
            .collect();
        store.insert_many(collections::TOKEN, docs).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_current_is_highest_height() {
        let queries = DigestQueries::new(seeded().await, 50);
        let current = queries
            .current(collections::TOKEN, &Filter::eq("contract", "CA1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current["height"], 30);
        assert_eq!(current["symbol"], "T30");
    }

    #[tokio::test]
    async fn test_current_absent() {
        let queries = DigestQueries::new(seeded().await, 50);
        let current = queries
            .current(collections::TOKEN, &Filter::eq("contract", "CA2"))
            .await
            .unwrap();
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn test_list_pages_by_ordering_field() {
        let queries = DigestQueries::new(seeded().await, 2);
        let page = PageRequest::forward().with_offset(10);
        let docs = queries
            .list(collections::TOKEN, Filter::eq("contract", "CA1"), "height", &page)
            .await
            .unwrap();
        let heights: Vec<_> = docs.iter().map(|d| d["height"].clone()).collect();
        assert_eq!(heights, vec![json!(20), json!(30)]);
    }
}
