//! # State Sync Bootstrap Flow
//!
//! A serving node admits unordered transactions and sweeps them on block
//! commit. A fresh node bootstraps from the serving node's snapshot through
//! the extension registry and must then reject exactly the replays the
//! serving node would reject.
//!
//! ```text
//! [serving node]                               [bootstrapping node]
//!   admit ──→ manager ←── sweeper(block)
//!                │
//!   registry.snapshot_all(height) ──items──→ registry.restore(reference)
//!                                                    │
//!                                               admit(replay) ──→ Duplicate
//! ```
//!
//! A bootstrapping node may reuse a data directory that still holds a replay
//! log from an earlier run. Restoring replaces that state wholesale.

#[cfg(test)]
mod tests {
    use crate::{init_tracing, tx_hash};
    use qc_18_unordered_tx::{
        ExpirySweeper, ReplayProtectionApi, UnorderedTxConfig, UnorderedTxError,
        UnorderedTxManager, UnorderedTxSnapshotter, SNAPSHOT_FORMAT, SNAPSHOT_NAME,
    };
    use shared_types::{ExtensionError, SnapshotExtensionRegistry};
    use std::sync::Arc;
    use tempfile::TempDir;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    struct TestNode {
        _dir: TempDir,
        manager: Arc<UnorderedTxManager>,
        registry: SnapshotExtensionRegistry,
    }

    impl TestNode {
        fn start() -> Self {
            Self::start_in(TempDir::new().unwrap())
        }

        fn start_in(dir: TempDir) -> Self {
            let mut config = UnorderedTxConfig::for_testing(dir.path());
            config.snapshot_chunk_entries = 8;
            config.sweep_queue_depth = 16;
            let manager = Arc::new(UnorderedTxManager::open(&config).unwrap());

            let mut registry = SnapshotExtensionRegistry::new();
            registry
                .register(
                    SNAPSHOT_NAME,
                    SNAPSHOT_FORMAT,
                    Arc::new(UnorderedTxSnapshotter::new(manager.clone())),
                )
                .unwrap();

            Self {
                _dir: dir,
                manager,
                registry,
            }
        }

        fn stop(self) -> TempDir {
            self.manager.close().unwrap();
            self._dir
        }
    }

    const GENESIS: u64 = 1_700_000_000;

    // =========================================================================
    // FLOWS
    // =========================================================================

    #[tokio::test]
    async fn test_bootstrapped_node_rejects_replays() {
        init_tracing();
        let serving = TestNode::start();

        // 40 short-lived and 60 long-lived transactions.
        for id in 0..100u64 {
            let ttl = if id < 40 { 30 } else { 600 };
            serving.manager.admit(tx_hash(id), GENESIS + ttl).unwrap();
        }

        let sweeper = ExpirySweeper::spawn_configured(serving.manager.clone());
        assert!(sweeper.notify(GENESIS + 60));
        sweeper.shutdown().await.unwrap();
        assert_eq!(serving.manager.size(), 60);

        let items = serving.registry.snapshot_all(12).unwrap();
        let item = items
            .iter()
            .find(|i| i.name == SNAPSHOT_NAME)
            .expect("unordered tx extension snapshotted");

        let fresh = TestNode::start();
        fresh.registry.restore(GENESIS + 60, item).unwrap();
        fresh.manager.on_new_block(GENESIS + 60).unwrap();

        assert_eq!(fresh.manager.size(), 60);
        for id in 0..40u64 {
            // Window elapsed: accepted again on both nodes.
            fresh.manager.admit(tx_hash(id), GENESIS + 600).unwrap();
        }
        for id in 40..100u64 {
            assert!(matches!(
                fresh.manager.admit(tx_hash(id), GENESIS + 600),
                Err(UnorderedTxError::DuplicateTransaction(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_old_snapshot_does_not_resurrect_elapsed_windows() {
        init_tracing();
        let serving = TestNode::start();
        for id in 0..20u64 {
            serving.manager.admit(tx_hash(id), GENESIS + 100).unwrap();
        }
        let items = serving.registry.snapshot_all(5).unwrap();

        // Consumed long after every window closed.
        let fresh = TestNode::start();
        fresh.registry.restore(GENESIS + 1_000, &items[0]).unwrap();

        assert_eq!(fresh.manager.size(), 0);
        assert!(!fresh.manager.contains(&tx_hash(0)));
    }

    #[tokio::test]
    async fn test_bootstrap_over_stale_data_dir() {
        init_tracing();
        let serving = TestNode::start();
        for id in 0..30u64 {
            serving.manager.admit(tx_hash(id), GENESIS + 500).unwrap();
        }
        let items = serving.registry.snapshot_all(9).unwrap();

        // An earlier run left its own log behind in the data directory.
        let earlier = TestNode::start();
        for id in 1_000..1_050u64 {
            earlier.manager.admit(tx_hash(id), GENESIS + 900).unwrap();
        }
        let dir = earlier.stop();

        let node = TestNode::start_in(dir);
        assert_eq!(node.manager.size(), 50);
        node.registry.restore(GENESIS, &items[0]).unwrap();

        assert_eq!(node.manager.size(), 30);
        assert!(!node.manager.contains(&tx_hash(1_000)));
        assert!(node.manager.contains(&tx_hash(0)));

        // The stale records are gone from disk too.
        let dir = node.stop();
        let reopened = TestNode::start_in(dir);
        assert_eq!(reopened.manager.size(), 30);
        assert!(!reopened.manager.contains(&tx_hash(1_049)));
    }

    #[tokio::test]
    async fn test_unknown_extension_rejected() {
        let serving = TestNode::start();
        let mut items = serving.registry.snapshot_all(1).unwrap();
        items[0].name = "module_state".to_string();

        let fresh = TestNode::start();
        let err = fresh.registry.restore(0, &items[0]).unwrap_err();
        assert_eq!(err, ExtensionError::UnknownExtension("module_state".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_admission_races_commit_path() {
        init_tracing();
        let node = TestNode::start();
        let api: Arc<dyn ReplayProtectionApi> = node.manager.clone();
        let sweeper = ExpirySweeper::spawn_configured(node.manager.clone());

        // Each hash is submitted by two racing admitters.
        let mut admitters = Vec::new();
        for worker in 0..4u64 {
            let api = api.clone();
            admitters.push(tokio::task::spawn_blocking(move || {
                let mut accepted = 0usize;
                for id in 0..200u64 {
                    let id = (worker % 2) * 200 + id;
                    if api.admit(tx_hash(id), GENESIS + 10_000).is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            }));
        }

        for block in 0..20u64 {
            sweeper.notify(GENESIS + block);
            tokio::task::yield_now().await;
        }

        let mut accepted = 0;
        for handle in admitters {
            accepted += handle.await.unwrap();
        }
        sweeper.shutdown().await.unwrap();

        assert_eq!(accepted, 400);
        assert_eq!(node.manager.size(), 400);
        for id in 0..400u64 {
            assert!(node.manager.contains(&tx_hash(id)));
        }
    }
}
