//! # Expiry Sweeper
//!
//! Background task that sweeps the manager off the block commit path.
//!
//! ```text
//! commit path ──notify(block_time)──→ [bounded queue] ──→ sweeper task
//!                                                            │
//!                                   spawn_blocking(on_new_block)
//! ```
//!
//! `notify` never blocks: when the queue is full the signal is dropped, since
//! the next block time supersedes it. An optional clock drives sweeps on a
//! fixed period when no blocks arrive.

use crate::domain::Timestamp;
use crate::ports::TimeSource;
use crate::service::UnorderedTxManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Handle to a running sweeper task.
pub struct ExpirySweeper {
    tx: mpsc::Sender<Timestamp>,
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Spawns a sweeper driven only by `notify`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(manager: Arc<UnorderedTxManager>, queue_depth: usize) -> Self {
        Self::start(manager, queue_depth, None)
    }

    /// Spawns a sweeper whose queue depth comes from the manager's config.
    pub fn spawn_configured(manager: Arc<UnorderedTxManager>) -> Self {
        let queue_depth = manager.config().sweep_queue_depth;
        Self::start(manager, queue_depth, None)
    }

    /// Spawns a sweeper that also sweeps every `period` at `clock.now()`.
    pub fn spawn_periodic(
        manager: Arc<UnorderedTxManager>,
        queue_depth: usize,
        clock: Arc<dyn TimeSource>,
        period: Duration,
    ) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self::start(manager, queue_depth, Some((clock, ticker)))
    }

    fn start(
        manager: Arc<UnorderedTxManager>,
        queue_depth: usize,
        clock: Option<(Arc<dyn TimeSource>, Interval)>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let handle = tokio::spawn(run(manager, rx, clock));
        info!("[qc-18] Expiry sweeper started");
        Self { tx, handle }
    }

    /// Queues a sweep at `block_time`. Returns false if the signal was dropped.
    pub fn notify(&self, block_time: Timestamp) -> bool {
        match self.tx.try_send(block_time) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "[qc-18] Sweeper queue full, dropping block time {}",
                    block_time
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stops the task after it drains queued signals.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        drop(self.tx);
        self.handle.await?;
        info!("[qc-18] Expiry sweeper stopped");
        Ok(())
    }
}

async fn run(
    manager: Arc<UnorderedTxManager>,
    mut rx: mpsc::Receiver<Timestamp>,
    mut clock: Option<(Arc<dyn TimeSource>, Interval)>,
) {
    loop {
        let block_time = tokio::select! {
            signal = rx.recv() => match signal {
                Some(block_time) => block_time,
                None => break,
            },
            now = next_tick(&mut clock) => now,
        };

        let target = manager.clone();
        match tokio::task::spawn_blocking(move || target.on_new_block(block_time)).await {
            Ok(Ok(removed)) => {
                debug!("[qc-18] Sweep at {} removed {} entries", block_time, removed);
            }
            Ok(Err(e)) => {
                error!("[qc-18] Sweep at {} failed: {}", block_time, e);
            }
            Err(e) => {
                error!("[qc-18] Sweep task at {} aborted: {}", block_time, e);
            }
        }
    }
}

async fn next_tick(clock: &mut Option<(Arc<dyn TimeSource>, Interval)>) -> Timestamp {
    match clock {
        Some((source, ticker)) => {
            ticker.tick().await;
            source.now()
        }
        None => std::future::pending().await,
    }
}
