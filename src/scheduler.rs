//! Sync scheduling.
//!
//! A single background task runs every sync pass: one immediately at
//! startup, one per interval tick, and one per manual trigger. Because
//! the task is the only consumer, passes never overlap — that is the
//! single-flight guarantee, enforced by structure rather than a lock.
//!
//! Manual triggers go through a capacity-1 channel. A trigger arriving
//! while a pass is running or already queued is coalesced into the
//! pending one; [`SyncHandle::request_sync`] tells the caller which of
//! the two happened. Steady-state failures are logged and the loop keeps
//! going; nothing here can crash the process.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::sync::Synchronizer;

/// Handle for requesting an out-of-band sync pass.
#[derive(Clone)]
pub struct SyncHandle {
    trigger: mpsc::Sender<()>,
}

impl SyncHandle {
    /// Request a sync pass without waiting for it. Returns `true` when a
    /// new pass was scheduled, `false` when one was already pending and
    /// this request was coalesced into it.
    pub fn request_sync(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }
}

/// Spawn the scheduler task and return the manual-trigger handle.
pub fn spawn(synchronizer: Arc<Synchronizer>, interval: Duration) -> SyncHandle {
    let (tx, mut rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A late pass delays the next tick instead of bunching them up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "sync scheduler started");

        loop {
            // The first tick fires immediately, giving the startup pass.
            tokio::select! {
                _ = ticker.tick() => run_pass(&synchronizer).await,
                Some(()) = rx.recv() => {
                    info!("manual sync triggered");
                    run_pass(&synchronizer).await;
                }
            }
        }
    });

    SyncHandle { trigger: tx }
}

async fn run_pass(synchronizer: &Synchronizer) {
    match synchronizer.sync().await {
        Ok(report) => {
            info!(
                fetched = report.fetched,
                indexed = report.indexed,
                failed = report.failures.len(),
                "sync pass finished"
            );
        }
        Err(e) => error!("sync pass failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_is_coalesced_while_one_is_pending() {
        let (tx, _rx) = mpsc::channel::<()>(1);
        let handle = SyncHandle { trigger: tx };

        // Nothing is draining the queue, so the first request occupies
        // the single slot and the second merges into it.
        assert!(handle.request_sync());
        assert!(!handle.request_sync());
    }

    #[test]
    fn slot_frees_after_consumption() {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let handle = SyncHandle { trigger: tx };

        assert!(handle.request_sync());
        rx.try_recv().unwrap();
        assert!(handle.request_sync());
    }
}
