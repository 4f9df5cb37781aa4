//! Node lifecycle against a real export directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dg_01_document_store::{collections, DocumentStore, Filter, FindOptions, InMemoryDocumentStore};
use digest_node::{DigestNode, NodeConfig};
use shared_types::{BlockData, BlockManifest, Height};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn export(dir: &Path, height: u64) {
    let block = BlockData {
        network_id: "mitum".into(),
        manifest: BlockManifest {
            height: Height(height),
            hash: format!("H{height}"),
            previous: height.checked_sub(1).map(|h| format!("H{h}")),
            proposal: format!("P{height}"),
            operations_tree: None,
            states_tree: None,
            suffrage: None,
            proposed_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            signed_at: "2024-01-01T00:00:01Z".parse().unwrap(),
        },
        operations: vec![],
        state_mutations: vec![],
        inclusion_proof: Default::default(),
    };
    std::fs::write(
        dir.join(format!("{height}.json")),
        serde_json::to_vec(&block).unwrap(),
    )
    .unwrap();
}

fn node(blocks: &Path) -> (DigestNode, Arc<InMemoryDocumentStore>) {
    let mut config = NodeConfig::default();
    config.reader.blocks_dir = blocks.to_path_buf();
    config.follow.poll_interval_ms = 10;
    config.digest.retry_delay_ms = 10;
    config.digest.retry_attempts = 2;

    let store = Arc::new(InMemoryDocumentStore::new());
    (DigestNode::with_store(config, store.clone()), store)
}

async fn wait_for_watermark(node: &DigestNode, height: u64) {
    let coordinator = node.coordinator();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if coordinator.watermark().await.unwrap() == Some(Height(height)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("watermark not reached");
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_startup_catches_up_to_last_contiguous_export() {
    let dir = tempfile::tempdir().unwrap();
    for h in [0, 1, 2, 5] {
        export(dir.path(), h);
    }
    let (node, store) = node(dir.path());

    assert_eq!(node.start_digestion().await.unwrap(), Some(Height(2)));
    assert_eq!(store.len(collections::BLOCK), 3);

    node.shutdown().await;
}

#[tokio::test]
async fn test_new_exports_are_followed() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), 0);
    let (node, store) = node(dir.path());
    node.start_digestion().await.unwrap();

    export(dir.path(), 1);
    export(dir.path(), 2);
    wait_for_watermark(&node, 2).await;

    let block = node
        .store()
        .find_one(
            collections::BLOCK,
            &Filter::eq("height", 2u64),
            &FindOptions::new(),
        )
        .await
        .unwrap();
    assert!(block.is_some());
    assert_eq!(store.len(collections::BLOCK), 3);

    node.shutdown().await;
}

#[tokio::test]
async fn test_empty_export_dir_starts_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (node, store) = node(dir.path());

    assert_eq!(node.start_digestion().await.unwrap(), None);
    assert!(store.is_empty());

    export(dir.path(), 0);
    wait_for_watermark(&node, 0).await;

    node.shutdown().await;
}

#[tokio::test]
async fn test_restart_resumes_after_watermark() {
    let dir = tempfile::tempdir().unwrap();
    export(dir.path(), 0);
    export(dir.path(), 1);
    let store = Arc::new(InMemoryDocumentStore::new());

    let mut config = NodeConfig::default();
    config.reader.blocks_dir = dir.path().to_path_buf();
    config.follow.poll_interval_ms = 10;

    let first = DigestNode::with_store(config.clone(), store.clone());
    assert_eq!(first.start_digestion().await.unwrap(), Some(Height(1)));
    first.shutdown().await;

    export(dir.path(), 2);
    let second = DigestNode::with_store(config, store.clone());
    assert_eq!(second.start_digestion().await.unwrap(), Some(Height(2)));
    assert_eq!(store.len(collections::BLOCK), 3);
    second.shutdown().await;
}
