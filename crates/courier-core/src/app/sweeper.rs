//! ResultSweeper - 保持期間を過ぎた TaskResult の削除
//!
//! # フロー
//! 1. `interval` ごとに `date_created < now - ttl` の行を削除
//! 2. shutdown (`watch`) が来たら抜ける
//!
//! 失敗はログに残して次の周期で再試行します。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::ports::{Clock, ResultStore, StoreError};

pub struct ResultSweeper {
    store: Arc<dyn ResultStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultSweeper {
    pub fn new(store: Arc<dyn ResultStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// One pass. Returns how many rows were removed.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| StoreError::OperationFailed(format!("ttl out of range: {e}")))?;
        let cutoff = self.clock.now() - ttl;
        let removed = self.store.delete_created_before(cutoff).await?;
        if removed > 0 {
            info!(removed, %cutoff, "expired task results removed");
        } else {
            debug!(%cutoff, "no expired task results");
        }
        Ok(removed)
    }

    /// Sweeps every `interval` until `shutdown_rx` flips to `true`.
    pub async fn run(&self, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // sender が drop されたら止める
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.sweep().await {
                warn!(error = %e, "result sweep failed");
            }
        }
        debug!("result sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ResultId, TaskInvocation, TaskResult};
    use crate::impls::InMemoryResultStore;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    async fn seeded() -> Arc<InMemoryResultStore> {
        let store = Arc::new(InMemoryResultStore::new());
        let inv = TaskInvocation::new("app.tasks", "add");
        for (task_id, day) in [("old", 1), ("edge", 3), ("new", 9)] {
            let created = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
            let row = TaskResult::pending(ResultId::from(Ulid::new()), task_id.into(), &inv, created);
            store.upsert(row).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn sweep_deletes_rows_older_than_ttl() {
        let store = seeded().await;
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let sweeper = ResultSweeper::new(
            Arc::clone(&store) as Arc<dyn ResultStore>,
            Arc::new(FixedClock::new(now)),
            7 * DAY,
        );

        // cutoff = 2024-01-03; "edge" is not strictly older
        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert!(store.get(&"old".into()).await.unwrap().is_none());
        assert!(store.get(&"edge".into()).await.unwrap().is_some());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = seeded().await;
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let sweeper = Arc::new(ResultSweeper::new(
            Arc::clone(&store) as Arc<dyn ResultStore>,
            Arc::new(FixedClock::new(now)),
            DAY,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn({
            let sweeper = Arc::clone(&sweeper);
            async move { sweeper.run(Duration::from_millis(10), shutdown_rx).await }
        });

        // the first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }
}
