//! In-memory table of live leases and their expiry timers.
//!
//! One entry per leased video. Each entry owns a [`CancellationToken`] that
//! stops its timer task; the task itself runs the expiry future handed to
//! [`LeaseTable::arm`] when the delay elapses first.
//!
//! Leases are not durable. The catalog keeps `lease_expires_at` so a
//! restarted scheduler can re-arm them (see
//! [`AllocationScheduler::recover_leases`](crate::AllocationScheduler::recover_leases)).

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use annotator_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A live lease on one video.
pub struct Lease {
    pub lease_id: Uuid,
    pub video_id: DbId,
    pub client_id: String,
    pub expires_at: Timestamp,
    cancel: CancellationToken,
    timer: JoinHandle<()>,
}

impl Lease {
    pub fn info(&self) -> LeaseInfo {
        LeaseInfo {
            lease_id: self.lease_id,
            video_id: self.video_id,
            client_id: self.client_id.clone(),
            expires_at: self.expires_at,
        }
    }

    /// Stop the expiry timer. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the timer task to finish (after [`cancel`](Self::cancel) or expiry).
    pub async fn join(self) {
        if let Err(e) = self.timer.await {
            tracing::warn!(video_id = self.video_id, error = %e, "Lease timer task failed");
        }
    }
}

/// Read-only view of a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseInfo {
    pub lease_id: Uuid,
    pub video_id: DbId,
    pub client_id: String,
    pub expires_at: Timestamp,
}

/// Live leases keyed by video id.
///
/// Designed to be wrapped in `Arc` so expiry tasks can remove their own
/// entry.
#[derive(Default)]
pub struct LeaseTable {
    leases: Mutex<HashMap<DbId, Lease>>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lease and start its timer.
    ///
    /// `on_expire` receives the new lease id and builds the future that runs
    /// if `delay` elapses before the lease is cancelled. The entry is in the
    /// table before the timer can fire, so the expiry path always finds it.
    pub async fn arm<F, Fut>(
        &self,
        video_id: DbId,
        client_id: impl Into<String>,
        expires_at: Timestamp,
        delay: Duration,
        on_expire: F,
    ) -> LeaseInfo
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let lease_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let expiry = on_expire(lease_id);

        let mut leases = self.leases.lock().await;

        let token = cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => expiry.await,
            }
        });

        let lease = Lease {
            lease_id,
            video_id,
            client_id: client_id.into(),
            expires_at,
            cancel,
            timer,
        };
        let info = lease.info();

        if let Some(previous) = leases.insert(video_id, lease) {
            tracing::warn!(
                video_id,
                previous_lease = %previous.lease_id,
                "Replacing a live lease for the same video"
            );
            previous.cancel();
        }

        info
    }

    /// Cancel and remove the lease on `video_id`. Returns whether one existed.
    pub async fn cancel(&self, video_id: DbId) -> bool {
        match self.leases.lock().await.remove(&video_id) {
            Some(lease) => {
                lease.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the entry for `video_id` only if it is still `lease_id`.
    ///
    /// Called by a firing timer; a successor lease on the same video is kept.
    pub async fn remove_if(&self, video_id: DbId, lease_id: Uuid) -> bool {
        let mut leases = self.leases.lock().await;
        match leases.get(&video_id) {
            Some(lease) if lease.lease_id == lease_id => {
                leases.remove(&video_id);
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, video_id: DbId) -> bool {
        self.leases.lock().await.contains_key(&video_id)
    }

    pub async fn len(&self) -> usize {
        self.leases.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All live leases, ordered by expiry.
    pub async fn snapshot(&self) -> Vec<LeaseInfo> {
        let mut infos: Vec<LeaseInfo> = self
            .leases
            .lock()
            .await
            .values()
            .map(Lease::info)
            .collect();
        infos.sort_by_key(|l| (l.expires_at, l.video_id));
        infos
    }

    /// Cancel every timer and hand back the entries. Used at shutdown.
    pub async fn drain(&self) -> Vec<Lease> {
        let drained: Vec<Lease> = self.leases.lock().await.drain().map(|(_, l)| l).collect();
        for lease in &drained {
            lease.cancel();
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn now() -> Timestamp {
        chrono::Utc::now()
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let table = LeaseTable::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        table
            .arm(1, "client", now(), Duration::from_secs(20), move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(19)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let table = LeaseTable::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        table
            .arm(1, "client", now(), Duration::from_secs(20), move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(table.cancel(1).await);
        assert!(!table.cancel(1).await);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn remove_if_ignores_other_lease_ids() {
        let table = LeaseTable::new();
        let info = table
            .arm(5, "client", now(), Duration::from_secs(600), |_| async {})
            .await;

        assert!(!table.remove_if(5, Uuid::new_v4()).await);
        assert!(table.contains(5).await);

        assert!(table.remove_if(5, info.lease_id).await);
        assert!(!table.contains(5).await);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_and_cancels_previous_lease() {
        let table = LeaseTable::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&fired);
        let old = table
            .arm(1, "a", now(), Duration::from_secs(10), move |_| async move {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let new = table
            .arm(1, "b", now(), Duration::from_secs(600), |_| async {})
            .await;

        assert_ne!(old.lease_id, new.lease_id);
        assert_eq!(table.len().await, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(table.snapshot().await, vec![new]);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_cancels_everything() {
        let table = LeaseTable::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for video_id in 1..=3 {
            let counter = Arc::clone(&fired);
            table
                .arm(video_id, "c", now(), Duration::from_secs(5), move |_| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        let drained = table.drain().await;
        assert_eq!(drained.len(), 3);
        for lease in drained {
            lease.join().await;
        }

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_expiry() {
        let table = LeaseTable::new();
        let base = now();
        table
            .arm(1, "a", base + chrono::Duration::seconds(30), Duration::from_secs(600), |_| async {})
            .await;
        table
            .arm(2, "b", base + chrono::Duration::seconds(10), Duration::from_secs(600), |_| async {})
            .await;

        let ids: Vec<DbId> = table.snapshot().await.iter().map(|l| l.video_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
