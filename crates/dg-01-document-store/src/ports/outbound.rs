//! # Outbound Ports (Driven Ports / SPI)
//!
//! The storage interface the digestion pipeline and the query API are
//! written against.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::document::{Document, Filter, FindOptions};
use crate::domain::errors::StoreResult;

/// Document database abstraction.
///
/// Implementations must be safe to share across tasks. A bulk insert is
/// atomic per call at most; nothing spans collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert documents, returning how many the backend acknowledged.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64>;

    /// Delete every document matching `filter`, returning the count removed.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Replace the documents matching `filter` with `document`, inserting it
    /// when nothing matches.
    async fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: Document,
    ) -> StoreResult<()>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Option<Document>> {
        let options = options.clone().limit(1);
        Ok(self.find(collection, filter, &options).await?.into_iter().next())
    }

    async fn exists(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        Ok(self
            .find_one(collection, filter, &FindOptions::new())
            .await?
            .is_some())
    }

    /// Acquire a lease for a private per-session handle.
    ///
    /// Backends that pool connections hand one out here; the lease returns
    /// it when dropped.
    fn lease(&self) -> StoreResult<HandleLease> {
        Ok(HandleLease::untracked())
    }
}

/// Proof that a session handle is open. Releases on drop.
#[derive(Debug)]
pub struct HandleLease {
    open: Option<Arc<AtomicUsize>>,
}

impl HandleLease {
    /// A lease that tracks nothing.
    pub fn untracked() -> Self {
        Self { open: None }
    }

    /// A lease counted in `open` until dropped.
    pub fn tracked(open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self { open: Some(open) }
    }
}

impl Drop for HandleLease {
    fn drop(&mut self) {
        if let Some(open) = self.open.take() {
            open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Private store handle owned by one batch session.
///
/// Writes go through the shared store; the lease ties the handle's lifetime
/// to the session so it is released on every exit path.
pub struct StoreHandle {
    store: Arc<dyn DocumentStore>,
    _lease: HandleLease,
}

impl StoreHandle {
    pub fn open(store: Arc<dyn DocumentStore>) -> StoreResult<Self> {
        let lease = store.lease()?;
        Ok(Self {
            store,
            _lease: lease,
        })
    }

    pub async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64> {
        self.store.insert_many(collection, documents).await
    }

    pub async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.store.delete_many(collection, filter).await
    }

    /// Release the handle explicitly. Dropping it has the same effect.
    pub fn release(self) {}
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_lease_counts_until_dropped() {
        let open = Arc::new(AtomicUsize::new(0));
        let a = HandleLease::tracked(open.clone());
        let b = HandleLease::tracked(open.clone());
        assert_eq!(open.load(Ordering::SeqCst), 2);
        drop(a);
        assert_eq!(open.load(Ordering::SeqCst), 1);
        drop(b);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_untracked_lease_is_inert() {
        drop(HandleLease::untracked());
    }
}
