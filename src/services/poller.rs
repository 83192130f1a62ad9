//! Live telemetry poller
//!
//! Owns the repeating read cycle against the occupancy endpoint. The
//! [`SampleStore`] is the single source of truth for the last-known sample:
//! every request carries a monotonically increasing sequence number, and the
//! store applies responses last-write-wins by that sequence, so a late
//! response for an earlier request can never regress `current()`.
//!
//! Key behaviors:
//! - Fixed-interval ticks; each fetch runs as its own task so a slow
//!   response never delays the next scheduled poll
//! - Transport failure retains the previous sample, retried on the next tick
//! - `current()` is None only if no sample has ever arrived ("Unavailable")
//! - `stop()` cancels the timer and closes the store, so an in-flight
//!   response arriving afterwards is a no-op

use crate::domain::types::OccupancySample;
use crate::io::api::TempleApi;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct StoreInner {
    /// Sequence number of the last applied response
    last_seq: u64,
    sample: Option<OccupancySample>,
    /// Set on teardown; a closed store ignores every further response
    closed: bool,
}

/// Sequence-ordered container for the most recent occupancy sample
#[derive(Debug, Default)]
pub struct SampleStore {
    inner: RwLock<StoreInner>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a poll response. Returns true if the sample was accepted.
    ///
    /// Responses at or after the last applied sequence win; older ones are
    /// discarded so `current()` never moves backwards in time.
    pub fn apply(&self, seq: u64, sample: OccupancySample) -> bool {
        let mut inner = self.inner.write();
        if inner.closed {
            return false;
        }
        if inner.sample.is_some() && seq < inner.last_seq {
            return false;
        }
        inner.last_seq = seq;
        inner.sample = Some(sample);
        true
    }

    /// Last-known sample, or None if nothing has ever arrived
    pub fn current(&self) -> Option<OccupancySample> {
        self.inner.read().sample.clone()
    }

    /// Stop accepting responses. Current sample remains readable.
    pub fn close(&self) {
        self.inner.write().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }
}

/// Handle to a running poller; dropping it does not stop the task, call
/// [`PollerHandle::stop`] for deterministic teardown.
pub struct PollerHandle {
    store: Arc<SampleStore>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Last-known occupancy sample
    pub fn current(&self) -> Option<OccupancySample> {
        self.store.current()
    }

    /// Shared view of the sample store for views and the TUI
    pub fn store(&self) -> Arc<SampleStore> {
        self.store.clone()
    }

    /// Cancel the poll timer and render any in-flight response a no-op
    pub fn stop(self) {
        self.store.close();
        self.task.abort();
        info!("telemetry_poller_stopped");
    }
}

/// Fixed-interval occupancy poller
pub struct TelemetryPoller;

impl TelemetryPoller {
    /// Start polling GET /live_data every `interval`.
    ///
    /// The task also terminates when `shutdown` flips to true.
    pub fn start(
        api: TempleApi,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> PollerHandle {
        let store = Arc::new(SampleStore::new());
        let task_store = store.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut seq: u64 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        seq += 1;
                        let api = api.clone();
                        let store = task_store.clone();
                        // Fetch in its own task so the tick cadence holds even
                        // when a response is slow; the sequence check sorts
                        // out whatever order responses land in.
                        tokio::spawn(async move {
                            fetch_once(&api, &store, seq).await;
                        });
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            task_store.close();
                            info!("telemetry_poller_shutdown");
                            return;
                        }
                    }
                }
            }
        });

        info!(interval_ms = %interval.as_millis(), "telemetry_poller_started");
        PollerHandle { store, task }
    }
}

async fn fetch_once(api: &TempleApi, store: &SampleStore, seq: u64) {
    match api.live_data().await {
        Ok(sample) => {
            if store.apply(seq, sample.clone()) {
                debug!(seq = %seq, count = %sample.count, location = %sample.location_id, "live_data_applied");
            } else {
                debug!(seq = %seq, "live_data_stale_discarded");
            }
        }
        Err(e) => {
            // Previous sample is retained; the next tick is the retry.
            warn!(seq = %seq, error = %e, "live_data_poll_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LocationId;
    use chrono::{TimeZone, Utc};

    fn sample(count: u32, secs: i64) -> OccupancySample {
        OccupancySample {
            count,
            observed_at: Utc.timestamp_opt(1_730_000_000 + secs, 0).unwrap(),
            location_id: LocationId::from("main_entrance"),
        }
    }

    #[test]
    fn test_empty_store_is_unavailable() {
        let store = SampleStore::new();
        assert!(store.current().is_none());
    }

    #[test]
    fn test_apply_in_order() {
        let store = SampleStore::new();
        assert!(store.apply(1, sample(100, 0)));
        assert!(store.apply(2, sample(200, 5)));
        assert_eq!(store.current().unwrap().count, 200);
    }

    #[test]
    fn test_late_response_for_earlier_request_discarded() {
        let store = SampleStore::new();
        // Response for request #2 lands first
        assert!(store.apply(2, sample(200, 5)));
        // Request #1's response arrives late and must lose
        assert!(!store.apply(1, sample(100, 0)));

        let current = store.current().unwrap();
        assert_eq!(current.count, 200);
        assert_eq!(current.observed_at, sample(200, 5).observed_at);
    }

    #[test]
    fn test_first_sample_always_applies() {
        let store = SampleStore::new();
        // Even a low sequence number is better than no sample at all
        assert!(store.apply(3, sample(40, 0)));
        assert_eq!(store.current().unwrap().count, 40);
    }

    #[test]
    fn test_closed_store_ignores_responses() {
        let store = SampleStore::new();
        assert!(store.apply(1, sample(100, 0)));
        store.close();
        assert!(!store.apply(2, sample(500, 5)));
        // Last-known value stays readable after teardown
        assert_eq!(store.current().unwrap().count, 100);
    }

    #[tokio::test]
    async fn test_handle_stop_closes_store() {
        let config = crate::infra::Config::default();
        let api = TempleApi::new(&config);
        let (_tx, rx) = watch::channel(false);

        let handle = TelemetryPoller::start(api, Duration::from_secs(60), rx);
        let store = handle.store();
        handle.stop();

        assert!(store.is_closed());
        assert!(!store.apply(1, sample(100, 0)));
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_store() {
        let config = crate::infra::Config::default();
        let api = TempleApi::new(&config);
        let (tx, rx) = watch::channel(false);

        let handle = TelemetryPoller::start(api, Duration::from_secs(60), rx);
        let store = handle.store();
        tx.send(true).unwrap();

        // Give the task a moment to observe the signal
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.is_closed());
    }
}
