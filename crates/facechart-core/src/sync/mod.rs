//! Sync coordinator.
//!
//! Drains the store's pending queue to a [`RemoteSync`] collaborator. A drain
//! is split into three steps so callers can release the store while the
//! remote call is in flight:
//!
//! 1. [`SyncCoordinator::begin`] snapshots the queue into a [`SyncBatch`].
//! 2. [`SyncBatch::submit`] runs the health check and the batch call.
//! 3. [`SyncCoordinator::finish`] acknowledges the submitted sessions.
//!
//! [`SyncCoordinator::sync_now`] runs all three back to back. Failures never
//! touch the queue; sessions completed while a batch is in flight stay queued.
//! A batch that is dropped before `finish` (a cancelled `sync_now`, say)
//! releases the in-flight guard, so the next trigger starts a fresh attempt.

mod http;
mod remote;

pub use http::{BATCH_PATH, BatchRequest, DEFAULT_REQUEST_TIMEOUT_SECS, HEALTH_PATH, HttpRemote};
pub use remote::{BatchError, BatchReceipt, BoxFuture, MemoryRemote, RemoteError, RemoteSync};

use crate::config::SyncConfig;
use crate::model::{SessionId, TreatmentSession};
use crate::store::ChartingStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default interval between automatic syncs in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Why a sync attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("A sync is already in progress")]
    AlreadySyncing,
    #[error("Device is offline")]
    Offline,
    #[error("Sync server is unreachable")]
    Unreachable,
    #[error("Sync rejected: {0}")]
    Rejected(String),
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
}

/// Events for the UI, drained with [`SyncCoordinator::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A batch was taken from the queue.
    Started { sessions: usize },
    /// The remote acknowledged the batch.
    Succeeded { synced: usize },
    Failed { error: SyncError },
    ConnectivityChanged { online: bool },
}

/// Result of a successful sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Sessions removed from the queue, with status `Completed`.
    pub synced: Vec<TreatmentSession>,
    pub receipt: BatchReceipt,
}

/// Marks a sync in flight until dropped.
#[derive(Debug)]
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sessions taken from the queue for one submission.
///
/// Holding a batch keeps the coordinator in [`SyncStatus::Syncing`].
#[derive(Debug)]
pub struct SyncBatch {
    sessions: Vec<TreatmentSession>,
    _in_flight: InFlight,
}

impl SyncBatch {
    pub fn sessions(&self) -> &[TreatmentSession] {
        &self.sessions
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Check reachability, then submit the batch.
    ///
    /// An empty batch succeeds without contacting the remote.
    pub async fn submit<R: RemoteSync + ?Sized>(
        &self,
        remote: &R,
    ) -> Result<BatchReceipt, SyncError> {
        if self.sessions.is_empty() {
            return Ok(BatchReceipt::default());
        }
        if !remote.health_check().await {
            return Err(SyncError::Unreachable);
        }
        remote
            .submit_batch(&self.sessions)
            .await
            .map_err(|e| SyncError::Rejected(e.to_string()))
    }
}

/// Drains the pending queue to a remote.
pub struct SyncCoordinator<R: RemoteSync> {
    remote: R,
    online: bool,
    in_flight: Arc<AtomicBool>,
    interval: Duration,
    last_attempt: Instant,
    last_sync_time: Option<DateTime<Utc>>,
    last_error: Option<SyncError>,
    events: Vec<SyncEvent>,
}

impl<R: RemoteSync> SyncCoordinator<R> {
    /// Create an offline coordinator.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            online: false,
            in_flight: Arc::new(AtomicBool::new(false)),
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            last_attempt: Instant::now(),
            last_sync_time: None,
            last_error: None,
            events: Vec::new(),
        }
    }

    /// Create an offline coordinator using the configured interval.
    pub fn from_config(remote: R, config: &SyncConfig) -> Self {
        let mut coordinator = Self::new(remote);
        coordinator.set_interval(config.interval());
        coordinator
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SyncStatus {
        if self.is_syncing() {
            SyncStatus::Syncing
        } else {
            SyncStatus::Idle
        }
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync_time
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    /// Record connectivity without triggering a sync.
    pub fn set_online(&mut self, online: bool) {
        if self.online != online {
            self.online = online;
            log::info!("Connectivity changed: online={}", online);
            self.events.push(SyncEvent::ConnectivityChanged { online });
        }
    }

    /// Record connectivity and sync on the offline to online edge.
    ///
    /// Returns `None` if no sync was attempted.
    pub async fn on_connectivity_change(
        &mut self,
        online: bool,
        store: &mut ChartingStore,
    ) -> Option<Result<SyncReport, SyncError>> {
        let came_online = !self.online && online;
        self.set_online(online);
        if came_online && !self.is_syncing() && store.pending_count() > 0 {
            Some(self.sync_now(store).await)
        } else {
            None
        }
    }

    /// Whether the interval trigger is due.
    pub fn is_due(&self, store: &ChartingStore) -> bool {
        self.online
            && !self.is_syncing()
            && store.pending_count() > 0
            && self.last_attempt.elapsed() >= self.interval
    }

    /// Interval trigger. Call periodically; syncs when due.
    pub async fn tick(
        &mut self,
        store: &mut ChartingStore,
    ) -> Option<Result<SyncReport, SyncError>> {
        if self.is_due(store) {
            Some(self.sync_now(store).await)
        } else {
            None
        }
    }

    /// Manual trigger.
    pub async fn sync_now(&mut self, store: &mut ChartingStore) -> Result<SyncReport, SyncError> {
        let batch = self.begin(store)?;
        let result = batch.submit(&self.remote).await;
        self.finish(store, batch, result)
    }

    /// Take the current queue as a batch and mark a sync in flight.
    ///
    /// The sync stays in flight until the batch is passed to
    /// [`finish`](Self::finish) or dropped.
    pub fn begin(&mut self, store: &ChartingStore) -> Result<SyncBatch, SyncError> {
        if self.is_syncing() {
            return Err(SyncError::AlreadySyncing);
        }
        self.last_attempt = Instant::now();
        if !self.online {
            self.record_failure(SyncError::Offline);
            return Err(SyncError::Offline);
        }

        self.in_flight.store(true, Ordering::Release);
        let batch = SyncBatch {
            sessions: store.pending_sessions().to_vec(),
            _in_flight: InFlight(Arc::clone(&self.in_flight)),
        };
        if !batch.is_empty() {
            log::info!("Syncing {} pending session(s)", batch.len());
            self.events.push(SyncEvent::Started {
                sessions: batch.len(),
            });
        }
        Ok(batch)
    }

    /// Apply the outcome of a submitted batch.
    ///
    /// On success exactly the batch's sessions leave the queue.
    pub fn finish(
        &mut self,
        store: &mut ChartingStore,
        batch: SyncBatch,
        result: Result<BatchReceipt, SyncError>,
    ) -> Result<SyncReport, SyncError> {
        let ids = batch.ids();
        drop(batch);

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(error) => {
                self.record_failure(error.clone());
                return Err(error);
            }
        };

        self.last_error = None;
        if ids.is_empty() {
            return Ok(SyncReport::default());
        }

        let now = Utc::now();
        let synced = store.acknowledge_synced(&ids, now);
        self.last_sync_time = Some(now);
        log::info!(
            "Synced {} session(s) ({} new, {} duplicate), {} still pending",
            synced.len(),
            receipt.accepted,
            receipt.duplicates,
            store.pending_count()
        );
        self.events.push(SyncEvent::Succeeded {
            synced: synced.len(),
        });
        Ok(SyncReport { synced, receipt })
    }

    fn record_failure(&mut self, error: SyncError) {
        log::warn!("Sync failed: {}", error);
        self.events.push(SyncEvent::Failed {
            error: error.clone(),
        });
        self.last_error = Some(error);
    }

    /// Drain queued events.
    pub fn poll_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{
        Dose, Patient, Placement, PointDraft, ProductCategory, SessionStatus, ZoneRef,
    };
    use crate::storage::MemoryStorage;
    use chrono::NaiveDate;

    pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    fn complete_one(store: &mut ChartingStore, patient_id: &str) -> SessionId {
        let patient = Patient {
            id: patient_id.to_string(),
            first_name: "Jo".to_string(),
            last_name: "Park".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 8, 9).unwrap(),
            mrn: format!("MRN-{}", patient_id),
            phone: None,
            email: None,
            allergies: Vec::new(),
            last_visit: None,
        };
        store.start_session(patient, "dr-1").unwrap();
        let draft = PointDraft::new(
            ZoneRef::Free,
            Placement::Chart { x: 20.0, y: 20.0 },
            ProductCategory::Neurotoxin,
        )
        .with_dose(Dose::Units(10));
        store.add_injection_point(draft).unwrap();
        store.complete_session().unwrap()
    }

    fn store_with_pending(count: usize) -> ChartingStore {
        let mut store = ChartingStore::new(Arc::new(MemoryStorage::new()));
        for i in 0..count {
            complete_one(&mut store, &format!("p-{}", i));
        }
        store
    }

    fn online_coordinator() -> SyncCoordinator<MemoryRemote> {
        let mut coordinator = SyncCoordinator::new(MemoryRemote::new());
        coordinator.set_online(true);
        coordinator.poll_events();
        coordinator
    }

    #[test]
    fn test_sync_success_clears_queue() {
        let mut store = store_with_pending(2);
        let mut coordinator = online_coordinator();

        let report = block_on(coordinator.sync_now(&mut store)).unwrap();

        assert_eq!(store.pending_count(), 0);
        assert!(coordinator.last_sync_time().is_some());
        assert!(coordinator.last_error().is_none());
        assert_eq!(report.synced.len(), 2);
        assert_eq!(report.receipt, BatchReceipt::new(2, 0));
        for session in &report.synced {
            assert_eq!(session.status(), SessionStatus::Completed);
            assert!(session.synced_at.is_some());
        }
        assert_eq!(coordinator.remote().stored_count(), 2);
        assert_eq!(
            coordinator.poll_events(),
            vec![
                SyncEvent::Started { sessions: 2 },
                SyncEvent::Succeeded { synced: 2 }
            ]
        );
    }

    #[test]
    fn test_sync_offline_fails_without_touching_queue() {
        let mut store = store_with_pending(1);
        let mut coordinator = SyncCoordinator::new(MemoryRemote::new());

        let result = block_on(coordinator.sync_now(&mut store));

        assert_eq!(result, Err(SyncError::Offline));
        assert_eq!(store.pending_count(), 1);
        assert_eq!(coordinator.last_error(), Some(&SyncError::Offline));
        assert!(coordinator.last_sync_time().is_none());
        assert_eq!(coordinator.remote().submission_count(), 0);
    }

    #[test]
    fn test_sync_unreachable() {
        let mut store = store_with_pending(1);
        let mut coordinator = online_coordinator();
        coordinator.remote().set_reachable(false);

        let result = block_on(coordinator.sync_now(&mut store));

        assert_eq!(result, Err(SyncError::Unreachable));
        assert_eq!(store.pending_count(), 1);
        assert_eq!(coordinator.remote().submission_count(), 0);
        assert_eq!(coordinator.status(), SyncStatus::Idle);
    }

    #[test]
    fn test_sync_rejected_keeps_queue() {
        let mut store = store_with_pending(3);
        let mut coordinator = online_coordinator();
        coordinator.remote().set_rejection(Some("invalid provider".to_string()));

        let result = block_on(coordinator.sync_now(&mut store));

        assert!(
            matches!(result, Err(SyncError::Rejected(ref r)) if r.contains("invalid provider"))
        );
        assert_eq!(store.pending_count(), 3);
        assert!(coordinator.last_sync_time().is_none());
        assert!(matches!(
            coordinator.poll_events().last(),
            Some(SyncEvent::Failed { error: SyncError::Rejected(_) })
        ));

        // Next attempt succeeds once the remote accepts again.
        coordinator.remote().set_rejection(None);
        block_on(coordinator.sync_now(&mut store)).unwrap();
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let mut store = store_with_pending(0);
        let mut coordinator = online_coordinator();

        let report = block_on(coordinator.sync_now(&mut store)).unwrap();
        assert!(report.synced.is_empty());
        assert!(coordinator.last_sync_time().is_none());
        assert_eq!(coordinator.remote().submission_count(), 0);
        assert!(coordinator.poll_events().is_empty());
    }

    #[test]
    fn test_concurrent_begin_refused() {
        let store = store_with_pending(1);
        let mut coordinator = online_coordinator();

        let _batch = coordinator.begin(&store).unwrap();
        assert_eq!(coordinator.status(), SyncStatus::Syncing);
        assert_eq!(coordinator.begin(&store).unwrap_err(), SyncError::AlreadySyncing);
    }

    #[test]
    fn test_from_config_interval() {
        let config = SyncConfig {
            interval_secs: 0,
            ..Default::default()
        };
        let mut store = store_with_pending(1);
        let mut coordinator = SyncCoordinator::from_config(MemoryRemote::new(), &config);
        assert_eq!(coordinator.interval(), Duration::ZERO);

        coordinator.set_online(true);
        assert!(matches!(block_on(coordinator.tick(&mut store)), Some(Ok(_))));
    }

    #[test]
    fn test_dropped_batch_releases_guard() {
        let mut store = store_with_pending(1);
        let mut coordinator = online_coordinator();

        let batch = coordinator.begin(&store).unwrap();
        drop(batch);
        assert_eq!(coordinator.status(), SyncStatus::Idle);

        block_on(coordinator.sync_now(&mut store)).unwrap();
        assert_eq!(store.pending_count(), 0);
    }

    /// Remote whose health check never resolves while `stalled` is set.
    struct StalledRemote {
        inner: MemoryRemote,
        stalled: AtomicBool,
    }

    impl RemoteSync for StalledRemote {
        fn health_check(&self) -> BoxFuture<'_, bool> {
            if self.stalled.load(Ordering::SeqCst) {
                Box::pin(std::future::pending::<bool>())
            } else {
                self.inner.health_check()
            }
        }

        fn submit_batch<'a>(
            &'a self,
            sessions: &'a [TreatmentSession],
        ) -> BoxFuture<'a, Result<BatchReceipt, RemoteError>> {
            self.inner.submit_batch(sessions)
        }
    }

    #[test]
    fn test_cancelled_sync_releases_guard() {
        use std::task::{Context, Poll, Waker};

        let mut store = store_with_pending(1);
        let mut coordinator = SyncCoordinator::new(StalledRemote {
            inner: MemoryRemote::new(),
            stalled: AtomicBool::new(true),
        });
        coordinator.set_online(true);

        // Poll once so the batch is taken, then abandon the future.
        {
            let mut sync = std::pin::pin!(coordinator.sync_now(&mut store));
            let mut cx = Context::from_waker(Waker::noop());
            assert!(matches!(sync.as_mut().poll(&mut cx), Poll::Pending));
        }
        assert_eq!(coordinator.status(), SyncStatus::Idle);
        assert_eq!(store.pending_count(), 1);

        coordinator.remote().stalled.store(false, Ordering::SeqCst);
        block_on(coordinator.sync_now(&mut store)).unwrap();
        assert_eq!(store.pending_count(), 0);
        assert_eq!(coordinator.remote().inner.stored_count(), 1);
    }

    #[test]
    fn test_session_completed_mid_flight_stays_queued() {
        let mut store = store_with_pending(1);
        let mut coordinator = online_coordinator();

        let batch = coordinator.begin(&store).unwrap();
        let late = complete_one(&mut store, "late");
        let result = block_on(batch.submit(coordinator.remote()));
        coordinator.finish(&mut store, batch, result).unwrap();

        assert_eq!(store.pending_count(), 1);
        assert_eq!(store.pending_sessions()[0].id, late);
        assert_eq!(coordinator.status(), SyncStatus::Idle);
    }

    #[test]
    fn test_lost_acknowledgment_resend_is_idempotent() {
        let mut store = store_with_pending(2);
        let mut coordinator = online_coordinator();

        // Remote accepts, but the local acknowledgment never happens.
        let batch = coordinator.begin(&store).unwrap();
        block_on(batch.submit(coordinator.remote())).unwrap();
        coordinator.finish(&mut store, batch, Err(SyncError::Unreachable)).unwrap_err();
        assert_eq!(store.pending_count(), 2);

        let report = block_on(coordinator.sync_now(&mut store)).unwrap();
        assert_eq!(report.receipt, BatchReceipt::new(0, 2));
        assert_eq!(coordinator.remote().stored_count(), 2);
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_connectivity_edge_triggers_sync() {
        let mut store = store_with_pending(1);
        let mut coordinator = SyncCoordinator::new(MemoryRemote::new());

        let outcome = block_on(coordinator.on_connectivity_change(true, &mut store));
        assert!(matches!(outcome, Some(Ok(_))));
        assert_eq!(store.pending_count(), 0);

        // Already online: no edge, no sync.
        complete_one(&mut store, "p-2");
        assert!(block_on(coordinator.on_connectivity_change(true, &mut store)).is_none());
        assert_eq!(store.pending_count(), 1);

        assert!(block_on(coordinator.on_connectivity_change(false, &mut store)).is_none());
        let events = coordinator.poll_events();
        assert_eq!(events.first(), Some(&SyncEvent::ConnectivityChanged { online: true }));
        assert_eq!(events.last(), Some(&SyncEvent::ConnectivityChanged { online: false }));
    }

    #[test]
    fn test_connectivity_edge_with_empty_queue_does_nothing() {
        let mut store = store_with_pending(0);
        let mut coordinator = SyncCoordinator::new(MemoryRemote::new());
        assert!(block_on(coordinator.on_connectivity_change(true, &mut store)).is_none());
        assert!(coordinator.is_online());
    }

    #[test]
    fn test_tick_respects_interval() {
        let mut store = store_with_pending(1);
        let mut coordinator = online_coordinator();

        assert_eq!(coordinator.interval(), Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS));
        assert!(block_on(coordinator.tick(&mut store)).is_none());
        assert_eq!(store.pending_count(), 1);

        coordinator.set_interval(Duration::ZERO);
        assert!(matches!(block_on(coordinator.tick(&mut store)), Some(Ok(_))));
        assert_eq!(store.pending_count(), 0);

        // Nothing queued: nothing to do.
        assert!(block_on(coordinator.tick(&mut store)).is_none());
    }

    #[test]
    fn test_tick_offline_does_nothing() {
        let mut store = store_with_pending(1);
        let mut coordinator = SyncCoordinator::new(MemoryRemote::new());
        coordinator.set_interval(Duration::ZERO);
        assert!(block_on(coordinator.tick(&mut store)).is_none());
        assert!(coordinator.last_error().is_none());
    }
}
