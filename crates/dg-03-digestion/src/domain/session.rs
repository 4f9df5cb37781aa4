//! # Batch Session
//!
//! The per-height aggregate-and-commit unit.
//!
//! ```text
//! open ──→ prepare ──→ commit ──→ close
//!   │         │           │          ↑
//!   └─────────┴───────────┴──────────┘  (close also runs on drop)
//! ```
//!
//! `prepare` is all-or-nothing: any failure leaves the session without
//! buckets and nothing is written. `commit` writes the buckets in
//! [`COMMIT_PLAN`] order, chunked at the bulk-write limit. Once started it
//! runs to completion or to its first store error; shutdown is not observed
//! mid-commit. A failed commit can leave part of a height behind, which
//! [`discard_height`] removes before the height is attempted again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dg_01_document_store::{Document, DocumentStore, Filter, StoreError, StoreHandle};
use dg_02_record_projection::{
    BlockRecord, DigestedRecord, OperationRecord, ProjectorRegistry, RecordKind,
};
use serde_json::Value;
use shared_types::{BlockData, EntityError, Height};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::commit_plan::{commit_order, CommitStep, StepSource, COMMIT_PLAN};
use super::errors::SessionError;
use crate::metrics;

/// Inclusion outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProofEntry {
    in_state: bool,
    reason: Option<String>,
}

/// Everything `prepare` produced.
#[derive(Debug, Default)]
struct Prepared {
    block: Option<BlockRecord>,
    operations: Vec<OperationRecord>,
    buckets: HashMap<RecordKind, Vec<DigestedRecord>>,
}

impl Prepared {
    fn record_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

struct SessionState {
    block: Option<BlockData>,
    prepared: Option<Prepared>,
    handle: Option<StoreHandle>,
}

impl SessionState {
    fn release(&mut self) {
        self.block = None;
        self.prepared = None;
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }

    fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

/// Per-height batch of records and the private handle that writes them.
pub struct BatchSession {
    height: Height,
    registry: Arc<ProjectorRegistry>,
    bulk_write_limit: usize,
    state: Mutex<SessionState>,
}

impl BatchSession {
    /// Open a session for `block`, leasing a private store handle.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        registry: Arc<ProjectorRegistry>,
        block: BlockData,
        bulk_write_limit: usize,
    ) -> Result<Self, SessionError> {
        let height = block.height();
        let handle =
            StoreHandle::open(store).map_err(|source| SessionError::Handle { height, source })?;

        Ok(Self {
            height,
            registry,
            bulk_write_limit: bulk_write_limit.max(1),
            state: Mutex::new(SessionState {
                block: Some(block),
                prepared: None,
                handle: Some(handle),
            }),
        })
    }

    pub fn height(&self) -> Height {
        self.height
    }

    /// Build every record of the block.
    pub async fn prepare(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.is_closed() {
            return Err(SessionError::Closed {
                height: self.height,
            });
        }
        let block = state.block.as_ref().ok_or(SessionError::Closed {
            height: self.height,
        })?;

        let prepared = self.build(block)?;
        debug!(
            height = %self.height,
            operations = prepared.operations.len(),
            records = prepared.record_count(),
            "batch prepared"
        );
        state.prepared = Some(prepared);
        Ok(())
    }

    fn build(&self, block: &BlockData) -> Result<Prepared, SessionError> {
        let height = self.height;

        // (a) fact hash -> inclusion outcome
        let mut proof: HashMap<String, ProofEntry> =
            HashMap::with_capacity(block.inclusion_proof.len());
        block
            .inclusion_proof
            .traverse(|node| {
                let fact_hash = node.fact_hash()?;
                proof.insert(
                    fact_hash.to_string(),
                    ProofEntry {
                        in_state: node.in_state,
                        reason: node.reason.clone(),
                    },
                );
                Ok::<_, EntityError>(true)
            })
            .map_err(|source| SessionError::InvalidProof { height, source })?;

        // (b) manifest
        let block_record = BlockRecord::from_manifest(&block.manifest, block.operations.len());

        // (c) operations, in block order
        let mut operations = Vec::with_capacity(block.operations.len());
        for (index, operation) in block.operations.iter().enumerate() {
            let entry = proof.get(&operation.fact_hash).ok_or_else(|| {
                SessionError::OperationNotInProof {
                    height,
                    fact_hash: operation.fact_hash.clone(),
                }
            })?;
            operations.push(OperationRecord::new(
                operation,
                height,
                index as u64,
                entry.in_state,
                entry.reason.clone(),
                block.manifest.signed_at,
            ));
        }

        // (d) state mutations
        let mut buckets: HashMap<RecordKind, Vec<DigestedRecord>> = HashMap::new();
        for mutation in &block.state_mutations {
            match self
                .registry
                .project(mutation)
                .map_err(|source| SessionError::Projection { height, source })?
            {
                Some(record) => buckets.entry(record.kind()).or_default().push(record),
                None => trace!(key = %mutation.key, "state key not indexed"),
            }
        }

        Ok(Prepared {
            block: Some(block_record),
            operations,
            buckets,
        })
    }

    /// Write the prepared batch. Returns the number of documents inserted.
    pub async fn commit(&self) -> Result<u64, SessionError> {
        let height = self.height;
        let state = self.state.lock().await;
        if state.is_closed() {
            return Err(SessionError::Closed { height });
        }
        let Some(prepared) = state.prepared.as_ref() else {
            return Err(SessionError::NotPrepared { height });
        };
        let Some(handle) = state.handle.as_ref() else {
            return Err(SessionError::Closed { height });
        };

        let mut inserted = 0;
        for step in COMMIT_PLAN {
            let documents = step_documents(step, prepared)
                .map_err(|source| store_error(height, step, source))?;
            if documents.is_empty() {
                continue;
            }

            if step.is_pre_delete() {
                remove_superseded(handle, step, height, &documents)
                    .await
                    .map_err(|source| store_error(height, step, source))?;
            }

            let count = documents.len();
            inserted += write_chunks(handle, step.collection, documents, self.bulk_write_limit)
                .await
                .map_err(|source| store_error(height, step, source))?;
            metrics::record_documents_written(step.collection, count as u64);
        }

        debug!(height = %height, documents = inserted, "batch committed");
        Ok(inserted)
    }

    /// Drop the buckets and release the store handle. Idempotent.
    pub async fn close(&self) {
        self.state.lock().await.release();
    }
}

impl Drop for BatchSession {
    fn drop(&mut self) {
        self.state.get_mut().release();
    }
}

impl std::fmt::Debug for BatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSession")
            .field("height", &self.height)
            .field("bulk_write_limit", &self.bulk_write_limit)
            .finish_non_exhaustive()
    }
}

fn store_error(height: Height, step: &CommitStep, source: StoreError) -> SessionError {
    SessionError::Store {
        height,
        collection: step.collection,
        source,
    }
}

fn step_documents(step: &CommitStep, prepared: &Prepared) -> Result<Vec<Document>, StoreError> {
    match step.source {
        StepSource::Block => prepared.block.iter().map(BlockRecord::to_document).collect(),
        StepSource::Operations => prepared
            .operations
            .iter()
            .map(OperationRecord::to_document)
            .collect(),
        StepSource::Records(kinds) => kinds
            .iter()
            .filter_map(|kind| prepared.buckets.get(kind))
            .flatten()
            .map(DigestedRecord::to_document)
            .collect(),
    }
}

/// Delete every entry sharing an identity with `documents` at or below
/// `height`, so only the incoming version remains.
async fn remove_superseded(
    handle: &StoreHandle,
    step: &CommitStep,
    height: Height,
    documents: &[Document],
) -> Result<(), StoreError> {
    // Keyed by the serialized identity so each is deleted once, in a stable order.
    let mut identities: BTreeMap<String, Filter> = BTreeMap::new();

    for kind in step.kinds().iter().filter(|k| k.is_pre_delete()) {
        let fields = kind.identity_fields();
        for doc in documents {
            let values: Vec<Value> = fields
                .iter()
                .map(|f| doc.get(*f).cloned().unwrap_or(Value::Null))
                .collect();
            let key = Value::Array(values.clone()).to_string();

            identities.entry(key).or_insert_with(|| {
                fields
                    .iter()
                    .zip(values)
                    .fold(Filter::All, |filter, (field, value)| {
                        filter.and(Filter::eq(*field, value))
                    })
                    .and(Filter::lte("height", height.value()))
            });
        }
    }

    for filter in identities.values() {
        let removed = handle.delete_many(step.collection, filter).await?;
        trace!(collection = step.collection, removed, "superseded entries removed");
    }
    Ok(())
}

/// Insert `documents` in sequential chunks of at most `limit`.
async fn write_chunks(
    handle: &StoreHandle,
    collection: &str,
    documents: Vec<Document>,
    limit: usize,
) -> Result<u64, StoreError> {
    let mut inserted = 0;
    let mut remaining = documents.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<Document> = remaining.by_ref().take(limit).collect();
        let expected = chunk.len();

        let n = handle.insert_many(collection, chunk).await?;
        if n == 0 {
            return Err(StoreError::NothingInserted {
                collection: collection.to_string(),
                expected,
            });
        }
        inserted += n;
    }

    Ok(inserted)
}

/// Delete every document a commit of `height` writes, across all
/// collections of [`COMMIT_PLAN`]. Returns how many were removed.
pub async fn discard_height(
    store: Arc<dyn DocumentStore>,
    height: Height,
) -> Result<u64, SessionError> {
    let handle =
        StoreHandle::open(store).map_err(|source| SessionError::Handle { height, source })?;
    let filter = Filter::eq("height", height.value());

    let mut collections = commit_order();
    collections.dedup();

    let mut removed = 0;
    for collection in collections {
        removed += handle
            .delete_many(collection, &filter)
            .await
            .map_err(|source| SessionError::Store {
                height,
                collection,
                source,
            })?;
    }
    handle.release();
    Ok(removed)
}

/// Prepare, commit and close one block.
///
/// The session is closed on every exit path.
pub async fn digest_block(
    store: Arc<dyn DocumentStore>,
    registry: Arc<ProjectorRegistry>,
    block: BlockData,
    bulk_write_limit: usize,
) -> Result<u64, SessionError> {
    let session = BatchSession::open(store, registry, block, bulk_write_limit)?;

    let result = match session.prepare().await {
        Ok(()) => session.commit().await,
        Err(e) => Err(e),
    };

    session.close().await;
    result
}
