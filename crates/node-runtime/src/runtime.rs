//! The digest node: one coordinator, one export follower, one query API.

use std::sync::Arc;

use dg_01_document_store::{DocumentStore, StoreError};
use dg_02_record_projection::ProjectorRegistry;
use dg_03_digestion::{DigestCoordinator, DigestError, DigestFailure, FsBlockReader};
use parking_lot::Mutex;
use shared_types::Height;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{ConfigError, NodeConfig};
use crate::follower::{highest_contiguous, ExportFollower};
use crate::store::open_store;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("document store: {0}")]
    Store(#[from] StoreError),

    #[error("catch-up: {0}")]
    CatchUp(#[from] DigestError),

    #[error("block export directory: {0}")]
    Exports(#[from] std::io::Error),
}

pub struct DigestNode {
    config: NodeConfig,
    store: Arc<dyn DocumentStore>,
    coordinator: Arc<DigestCoordinator>,
    failures: Mutex<Option<mpsc::Receiver<DigestFailure>>>,
    failure_log: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DigestNode {
    /// Validate `config` and open the store. Nothing runs until
    /// [`DigestNode::start_digestion`].
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let store = open_store(&config.store)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: NodeConfig, store: Arc<dyn DocumentStore>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (failure_tx, failure_rx) = mpsc::channel(config.digest.error_channel_capacity);

        let reader = Arc::new(FsBlockReader::new(
            config.reader.blocks_dir.clone(),
            config.reader.network_id.clone(),
        ));
        let coordinator = Arc::new(DigestCoordinator::new(
            config.digest.clone(),
            store.clone(),
            reader,
            Arc::new(ProjectorRegistry::standard()),
            Some(failure_tx),
            shutdown_rx.clone(),
        ));

        Self {
            config,
            store,
            coordinator,
            failures: Mutex::new(Some(failure_rx)),
            failure_log: Mutex::new(None),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn coordinator(&self) -> Arc<DigestCoordinator> {
        self.coordinator.clone()
    }

    async fn first_pending(&self) -> Result<Height, NodeError> {
        Ok(match self.coordinator.watermark().await? {
            Some(w) => w.next(),
            None => self.config.digest.genesis(),
        })
    }

    /// Catch up on exported blocks, then start the worker and the follower.
    ///
    /// Returns the watermark reached by catch-up. A catch-up failure aborts
    /// startup.
    pub async fn start_digestion(&self) -> Result<Option<Height>, NodeError> {
        let blocks_dir = self.config.reader.blocks_dir.clone();
        let from = self.first_pending().await?;

        let target = match self.config.follow.target_height {
            Some(h) => Some(Height(h)),
            None => highest_contiguous(&blocks_dir, from).await?,
        };
        let reached = match target {
            Some(target) => {
                info!(from = %from, target = %target, "[dg-03] catching up");
                self.coordinator.follow_up(target).await?
            }
            None => self.coordinator.watermark().await?,
        };
        info!(watermark = ?reached, "[dg-03] catch-up done");

        self.coordinator.start();

        let failures = self.failures.lock().take();
        if let Some(mut failures) = failures {
            *self.failure_log.lock() = Some(tokio::spawn(async move {
                while let Some(failure) = failures.recv().await {
                    error!(
                        height = %failure.height,
                        error = %failure.error,
                        "[dg-03] height abandoned after retries"
                    );
                }
            }));
        }

        let follower = ExportFollower::new(blocks_dir, self.first_pending().await?);
        let handle = tokio::spawn(follower.run(
            self.coordinator.clone(),
            self.config.follow.poll_interval(),
            self.shutdown_rx.clone(),
        ));
        self.tasks.lock().push(handle);

        Ok(reached)
    }

    /// Serve the query API in the background.
    pub fn start_api(&self) {
        let config = self.config.api.clone();
        let store = self.store.clone();
        let shutdown = self.shutdown_rx.clone();
        self.tasks.lock().push(tokio::spawn(async move {
            if let Err(e) = dg_04_query_api::serve(config, store, shutdown).await {
                error!(error = %e, "[dg-04] query API failed");
            }
        }));
    }

    /// Signal shutdown and wait for the worker and the follower.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            warn!("Failed to send shutdown signal: {}", e);
        }

        self.coordinator.join().await;

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }

        // The failure log only drains while the coordinator lives.
        let failure_log = self.failure_log.lock().take();
        if let Some(task) = failure_log {
            task.abort();
        }
        info!("Shutdown complete");
    }
}
