//! # Digestion Coordinator
//!
//! Owns the single worker that turns queued block handles into committed
//! batches, and the catch-up scan that fills gaps from the block reader.
//!
//! ```text
//!            digest(blocks)                catch_up(target)
//!                 │ sort ascending                │
//!                 ↓                               │
//!   ┌──── unbounded queue (FIFO) ────┐            │
//!   │                                ↓            ↓
//!   │         worker ──→ digest lock ──→ per-height digestion
//!   │                                     ├─ already digested? skip
//!   │                                     ├─ read → discard partial → session → watermark
//!   │                                     └─ retry / report failure
//! ```
//!
//! ## States
//!
//! `Idle → Running → Stopping → Stopped`. A running coordinator alternates
//! between [`Activity::WaitingForWork`] and [`Activity::ProcessingHeight`].
//!
//! ## Watermark
//!
//! The watermark only moves forward by one: a committed height `h` becomes
//! the watermark when there is none yet or when it is exactly
//! watermark + 1. A height that never commits therefore pins the watermark,
//! which is what operators watch for.
//!
//! A height counts as digested only when its block record exists and the
//! watermark covers it. A block record above the watermark is what a failed
//! commit leaves behind, so that height's documents are discarded and the
//! height is digested again. Every retry attempt discards the same way.

use std::sync::Arc;

use dg_01_document_store::{collections, DocumentStore, Filter, StoreResult, WatermarkStore};
use dg_02_record_projection::ProjectorRegistry;
use parking_lot::{Mutex, RwLock};
use shared_types::{BlockHandle, Height};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DigestConfig;
use crate::domain::errors::{DigestError, DigestFailure};
use crate::domain::session::{digest_block, discard_height};
use crate::metrics;
use crate::ports::outbound::BlockReader;

/// Lifecycle of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    WaitingForWork,
    ProcessingHeight(Height),
}

/// Result of handling one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightOutcome {
    Digested,
    /// A block record existed at or below the watermark.
    AlreadyDigested,
}

struct Inner {
    config: DigestConfig,
    store: Arc<dyn DocumentStore>,
    reader: Arc<dyn BlockReader>,
    registry: Arc<ProjectorRegistry>,
    watermark: WatermarkStore,
    failures: Option<mpsc::Sender<DigestFailure>>,
    shutdown: watch::Receiver<bool>,
    /// Held for the whole of one height, by the worker or by catch-up.
    digest_lock: tokio::sync::Mutex<()>,
    state: RwLock<CoordinatorState>,
    activity: RwLock<Activity>,
}

/// Digestion Coordinator.
pub struct DigestCoordinator {
    inner: Arc<Inner>,
    queue: mpsc::UnboundedSender<BlockHandle>,
    pending: Mutex<Option<mpsc::UnboundedReceiver<BlockHandle>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DigestCoordinator {
    /// `failures` receives one report per height the worker gives up on.
    pub fn new(
        config: DigestConfig,
        store: Arc<dyn DocumentStore>,
        reader: Arc<dyn BlockReader>,
        registry: Arc<ProjectorRegistry>,
        failures: Option<mpsc::Sender<DigestFailure>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (queue, pending) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(Inner {
                config,
                watermark: WatermarkStore::new(store.clone()),
                store,
                reader,
                registry,
                failures,
                shutdown,
                digest_lock: tokio::sync::Mutex::new(()),
                state: RwLock::new(CoordinatorState::Idle),
                activity: RwLock::new(Activity::WaitingForWork),
            }),
            queue,
            pending: Mutex::new(Some(pending)),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker. Only the first call has an effect.
    pub fn start(&self) {
        let Some(queue) = self.pending.lock().take() else {
            warn!("[dg-03] coordinator already started");
            return;
        };

        *self.inner.state.write() = CoordinatorState::Running;
        let inner = self.inner.clone();
        *self.worker.lock() = Some(tokio::spawn(inner.run(queue)));
    }

    /// Enqueue `blocks`, ascending by height within this call.
    pub fn digest(&self, mut blocks: Vec<BlockHandle>) -> Result<usize, DigestError> {
        blocks.sort_by_key(|b| b.height);
        let count = blocks.len();

        for block in blocks {
            debug!(height = %block.height, "[dg-03] block enqueued");
            self.queue.send(block).map_err(|_| DigestError::Stopped)?;
        }
        Ok(count)
    }

    /// Digest every height after the watermark up to `target`, in order.
    ///
    /// Stops at the first height that fails after retries and returns that
    /// error. Returns the watermark reached.
    pub async fn catch_up(&self, target: Height) -> Result<Option<Height>, DigestError> {
        self.inner.catch_up(target).await
    }

    /// Catch up to `last_finalized` when it is ahead of the watermark.
    pub async fn follow_up(&self, last_finalized: Height) -> Result<Option<Height>, DigestError> {
        let watermark = self.inner.watermark.load().await?;
        match watermark {
            Some(w) if w >= last_finalized => Ok(Some(w)),
            _ => self.inner.catch_up(last_finalized).await,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        *self.inner.state.read()
    }

    pub fn activity(&self) -> Activity {
        *self.inner.activity.read()
    }

    /// Last digested height as persisted.
    pub async fn watermark(&self) -> StoreResult<Option<Height>> {
        self.inner.watermark.load().await
    }

    /// Wait for the worker to exit after shutdown.
    pub async fn join(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("[dg-03] digestion worker panicked: {e}");
            }
        }
    }
}

impl Inner {
    async fn run(self: Arc<Self>, mut queue: mpsc::UnboundedReceiver<BlockHandle>) {
        info!("[dg-03] digestion worker started");
        let mut shutdown = self.shutdown.clone();

        loop {
            *self.activity.write() = Activity::WaitingForWork;

            let block = tokio::select! {
                biased;
                _ = shutdown_signalled(&mut shutdown) => break,
                next = queue.recv() => match next {
                    Some(block) => block,
                    None => break,
                },
            };

            let height = block.height;
            *self.activity.write() = Activity::ProcessingHeight(height);

            match self.process_height(height).await {
                Ok(HeightOutcome::Digested) => {
                    info!(height = %height, "[dg-03] block digested");
                }
                Ok(HeightOutcome::AlreadyDigested) => {
                    debug!(height = %height, "[dg-03] block already digested, skipped");
                }
                Err(e) if e.is_cancelled() => {
                    info!(height = %height, "[dg-03] digestion cancelled");
                    break;
                }
                Err(e) => {
                    error!(height = %height, error = %e, "[dg-03] failed to digest block");
                    metrics::record_digest_failure();
                    self.report(DigestFailure { height, error: e });
                }
            }
        }

        *self.state.write() = CoordinatorState::Stopping;
        *self.activity.write() = Activity::WaitingForWork;
        info!("[dg-03] digestion worker stopped");
        *self.state.write() = CoordinatorState::Stopped;
    }

    async fn catch_up(&self, target: Height) -> Result<Option<Height>, DigestError> {
        let watermark = self.watermark.load().await?;
        let start = watermark.map_or(self.config.genesis(), Height::next);

        if start > target {
            return Ok(watermark);
        }

        info!(from = %start, to = %target, "[dg-03] catching up");
        for height in start.value()..=target.value() {
            if *self.shutdown.borrow() {
                return Err(DigestError::Cancelled);
            }
            if let Err(e) = self.process_height(Height(height)).await {
                warn!(height, error = %e, "[dg-03] catch-up stopped");
                return Err(e);
            }
        }

        Ok(self.watermark.load().await?)
    }

    /// Digest one height unless it already was, retrying transient failures.
    async fn process_height(&self, height: Height) -> Result<HeightOutcome, DigestError> {
        let _guard = self.digest_lock.lock().await;

        let covered = self
            .watermark
            .load()
            .await?
            .is_some_and(|w| height <= w);
        let mut partial = false;
        if self.has_block_record(height).await? {
            if covered {
                metrics::record_block_skipped();
                return Ok(HeightOutcome::AlreadyDigested);
            }
            warn!(height = %height, "[dg-03] block record above the watermark, digesting again");
            partial = true;
        }

        let attempts = self.config.retry_attempts.max(1);
        let mut shutdown = self.shutdown.clone();
        let mut attempt = 1;

        loop {
            if *shutdown.borrow() {
                return Err(DigestError::Cancelled);
            }

            match self.digest_once(height, partial || attempt > 1).await {
                Ok(documents) => {
                    debug!(height = %height, documents, attempt, "[dg-03] height committed");
                    metrics::record_block_digested();
                    return Ok(HeightOutcome::Digested);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!(
                        height = %height,
                        attempt,
                        attempts,
                        error = %e,
                        "[dg-03] digestion attempt failed, retrying"
                    );
                    metrics::record_retry();
                }
            }

            attempt += 1;
            tokio::select! {
                _ = tokio::time::sleep(self.config.retry_delay()) => {}
                _ = shutdown_signalled(&mut shutdown) => return Err(DigestError::Cancelled),
            }
        }
    }

    /// One attempt. With `discard`, documents an earlier commit of this
    /// height left behind are removed first.
    async fn digest_once(&self, height: Height, discard: bool) -> Result<u64, DigestError> {
        let block = self.reader.read_block_at(height).await?;
        if discard {
            let removed = discard_height(self.store.clone(), height).await?;
            if removed > 0 {
                warn!(height = %height, removed, "[dg-03] discarded partial commit");
            }
        }
        let documents = digest_block(
            self.store.clone(),
            self.registry.clone(),
            block,
            self.config.bulk_write_limit,
        )
        .await?;
        self.advance_watermark(height).await?;
        Ok(documents)
    }

    async fn has_block_record(&self, height: Height) -> StoreResult<bool> {
        self.store
            .exists(collections::BLOCK, &Filter::eq("height", height.value()))
            .await
    }

    async fn advance_watermark(&self, height: Height) -> StoreResult<()> {
        match self.watermark.load().await? {
            Some(current) if height <= current => Ok(()),
            Some(current) if height != current.next() => {
                warn!(
                    height = %height,
                    watermark = %current,
                    "[dg-03] height committed out of order, watermark not advanced"
                );
                Ok(())
            }
            _ => {
                self.watermark.save(height).await?;
                metrics::set_watermark(height.value());
                Ok(())
            }
        }
    }

    fn report(&self, failure: DigestFailure) {
        let Some(failures) = &self.failures else {
            return;
        };
        if let Err(e) = failures.try_send(failure) {
            warn!("[dg-03] error report dropped: {e}");
        }
    }
}

/// Resolves once shutdown is signalled. Never resolves if the sender is
/// gone without having signalled.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
