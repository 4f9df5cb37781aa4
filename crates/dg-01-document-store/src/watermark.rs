//! # Digestion Watermark
//!
//! The single durable checkpoint of the pipeline: the last height whose
//! batch committed. Resumption after a crash always starts at
//! watermark + 1.

use std::sync::Arc;

use serde_json::json;
use shared_types::Height;

use crate::collections;
use crate::domain::document::{Document, Filter, FindOptions};
use crate::domain::errors::{StoreError, StoreResult};
use crate::ports::outbound::DocumentStore;

const WATERMARK_ID: &str = "last_digested_height";

/// Reads and writes the watermark document in [`collections::INTERNAL`].
#[derive(Clone)]
pub struct WatermarkStore {
    store: Arc<dyn DocumentStore>,
}

impl WatermarkStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn filter() -> Filter {
        Filter::eq("_id", WATERMARK_ID)
    }

    /// `None` when nothing has been digested yet.
    pub async fn load(&self) -> StoreResult<Option<Height>> {
        let doc = self
            .store
            .find_one(collections::INTERNAL, &Self::filter(), &FindOptions::new())
            .await?;

        match doc {
            None => Ok(None),
            Some(doc) => doc
                .get("height")
                .and_then(|h| h.as_u64())
                .map(|h| Some(Height(h)))
                .ok_or_else(|| {
                    StoreError::backend(collections::INTERNAL, "watermark document has no height")
                }),
        }
    }

    pub async fn save(&self, height: Height) -> StoreResult<()> {
        let mut doc = Document::new();
        doc.insert("_id".into(), json!(WATERMARK_ID));
        doc.insert("height".into(), json!(height.value()));
        self.store
            .replace_one(collections::INTERNAL, &Self::filter(), doc)
            .await
    }
}
