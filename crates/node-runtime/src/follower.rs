//! Follows the block export directory.
//!
//! The node's exporter writes `{height}.json` per finalized block. Heights
//! are handed to the coordinator in order, stopping at the first gap; a file
//! that does not decode yet (still being written) is retried next scan.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dg_03_digestion::DigestCoordinator;
use serde::Deserialize;
use shared_types::{BlockHandle, Height};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct ExportHeader {
    manifest: ManifestRef,
}

#[derive(Deserialize)]
struct ManifestRef {
    height: Height,
    hash: String,
}

/// Heights with an export file in `dir`.
pub async fn exported_heights(dir: &Path) -> io::Result<BTreeSet<u64>> {
    let mut heights = BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(heights),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(height) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            heights.insert(height);
        }
    }
    Ok(heights)
}

/// Last height of the unbroken run of exports starting at `from`.
pub async fn highest_contiguous(dir: &Path, from: Height) -> io::Result<Option<Height>> {
    let heights = exported_heights(dir).await?;
    let mut last = None;
    let mut next = from.value();
    while heights.contains(&next) {
        last = Some(Height(next));
        next += 1;
    }
    Ok(last)
}

pub struct ExportFollower {
    dir: PathBuf,
    next: Height,
}

impl ExportFollower {
    pub fn new(dir: impl Into<PathBuf>, next: Height) -> Self {
        Self {
            dir: dir.into(),
            next,
        }
    }

    /// Next height expected from the exporter.
    pub fn next_height(&self) -> Height {
        self.next
    }

    /// Handles of new contiguous exports.
    pub async fn poll(&mut self) -> io::Result<Vec<BlockHandle>> {
        let heights = exported_heights(&self.dir).await?;
        let mut handles = Vec::new();

        while heights.contains(&self.next.value()) {
            let path = self.dir.join(format!("{}.json", self.next));
            let bytes = tokio::fs::read(&path).await?;
            let header: ExportHeader = match serde_json::from_slice(&bytes) {
                Ok(header) => header,
                Err(e) => {
                    debug!(height = %self.next, error = %e, "export not readable yet");
                    break;
                }
            };
            if header.manifest.height != self.next {
                warn!(
                    height = %self.next,
                    manifest_height = %header.manifest.height,
                    "export file names the wrong height, waiting"
                );
                break;
            }

            handles.push(BlockHandle::new(self.next, header.manifest.hash));
            self.next = self.next.next();
        }
        Ok(handles)
    }

    /// Enqueue new exports every `interval` until shutdown.
    pub async fn run(
        mut self,
        coordinator: Arc<DigestCoordinator>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(dir = %self.dir.display(), next = %self.next, "[dg-03] following block exports");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let handles = match self.poll().await {
                        Ok(handles) => handles,
                        Err(e) => {
                            warn!(error = %e, "[dg-03] export scan failed");
                            continue;
                        }
                    };
                    if handles.is_empty() {
                        continue;
                    }
                    if let Err(e) = coordinator.digest(handles) {
                        warn!(error = %e, "[dg-03] coordinator no longer accepts blocks");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[dg-03] export follower stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export(dir: &Path, height: u64) {
        let body = json!({
            "network_id": "mitum",
            "manifest": {"height": height, "hash": format!("H{height}")},
        });
        std::fs::write(dir.join(format!("{height}.json")), body.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_scan_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        export(dir.path(), 0);
        export(dir.path(), 2);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("abc.json"), "{}").unwrap();

        let heights = exported_heights(dir.path()).await.unwrap();
        assert_eq!(heights.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let heights = exported_heights(&dir.path().join("absent")).await.unwrap();
        assert!(heights.is_empty());
    }

    #[tokio::test]
    async fn test_highest_contiguous_stops_at_gap() {
        let dir = tempfile::tempdir().unwrap();
        for h in [0, 1, 2, 4] {
            export(dir.path(), h);
        }
        assert_eq!(
            highest_contiguous(dir.path(), Height(0)).await.unwrap(),
            Some(Height(2))
        );
        assert_eq!(highest_contiguous(dir.path(), Height(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_hands_out_each_height_once() {
        let dir = tempfile::tempdir().unwrap();
        export(dir.path(), 5);
        export(dir.path(), 6);
        let mut follower = ExportFollower::new(dir.path(), Height(5));

        let handles = follower.poll().await.unwrap();
        assert_eq!(handles, vec![BlockHandle::new(5u64, "H5"), BlockHandle::new(6u64, "H6")]);
        assert!(follower.poll().await.unwrap().is_empty());

        export(dir.path(), 7);
        assert_eq!(follower.poll().await.unwrap(), vec![BlockHandle::new(7u64, "H7")]);
        assert_eq!(follower.next_height(), Height(8));
    }

    #[tokio::test]
    async fn test_partial_file_retried() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0.json"), "{\"manifest\": {").unwrap();
        let mut follower = ExportFollower::new(dir.path(), Height(0));

        assert!(follower.poll().await.unwrap().is_empty());
        export(dir.path(), 0);
        assert_eq!(follower.poll().await.unwrap().len(), 1);
    }
}
