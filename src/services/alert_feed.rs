//! SOS alert feed
//!
//! Single source of truth for emergency alerts on this client. Transitions
//! are forward-only (new -> acknowledged -> resolved) and idempotent:
//! repeating a transition is a no-op, skipping a step is rejected, and a
//! transition on an unknown id mutates nothing. Remote refreshes merge under
//! the same rule, so a stale server snapshot never regresses a status a
//! staff member has already advanced locally.

use crate::domain::alert::{AlertStatus, EmergencyAlert, TransitionError};
use crate::domain::types::AlertId;
use crate::io::api::TempleApi;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a successful transition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changed
    Applied,
    /// The alert was already at (or past) the requested status
    NoOp,
}

/// In-memory emergency alert collection
#[derive(Debug, Default)]
pub struct AlertFeed {
    alerts: RwLock<HashMap<AlertId, EmergencyAlert>>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// All known alerts, newest first
    pub fn list(&self) -> Vec<EmergencyAlert> {
        let mut alerts: Vec<EmergencyAlert> = self.alerts.read().values().cloned().collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        alerts
    }

    /// Non-resolved alerts, newest first
    pub fn active(&self) -> Vec<EmergencyAlert> {
        self.list().into_iter().filter(EmergencyAlert::is_active).collect()
    }

    pub fn get(&self, id: AlertId) -> Option<EmergencyAlert> {
        self.alerts.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }

    /// Insert a newly created alert (e.g. the response to an SOS POST)
    pub fn insert(&self, alert: EmergencyAlert) {
        debug!(alert_id = %alert.id, status = %alert.status.as_str(), "alert_inserted");
        self.alerts.write().insert(alert.id, alert);
    }

    /// Mark an alert acknowledged. Idempotent; rejected on a resolved alert.
    pub fn acknowledge(&self, id: AlertId) -> Result<Transition, TransitionError> {
        self.transition(id, AlertStatus::Acknowledged)
    }

    /// Mark an alert resolved. Requires it to be acknowledged first.
    pub fn resolve(&self, id: AlertId) -> Result<Transition, TransitionError> {
        self.transition(id, AlertStatus::Resolved)
    }

    fn transition(&self, id: AlertId, to: AlertStatus) -> Result<Transition, TransitionError> {
        let mut alerts = self.alerts.write();
        let alert = alerts.get_mut(&id).ok_or(TransitionError::NotFound(id))?;

        if alert.status == to {
            return Ok(Transition::NoOp);
        }
        // Exactly one step forward is legal; everything else is rejected
        // (resolve-before-acknowledge, any move backwards).
        let legal = matches!(
            (alert.status, to),
            (AlertStatus::New, AlertStatus::Acknowledged)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        );
        if !legal {
            return Err(TransitionError::InvalidTransition { id, from: alert.status, to });
        }

        alert.status = to;
        info!(alert_id = %id, status = %to.as_str(), "alert_transition");
        Ok(Transition::Applied)
    }

    /// Merge a remote snapshot into the feed.
    ///
    /// Unknown alerts are inserted. For known alerts the higher status wins
    /// (status only ever moves forward), so a refresh that raced a local
    /// acknowledge cannot undo it. Alerts missing from the snapshot are kept;
    /// nothing is deleted client-side.
    pub fn merge_remote(&self, remote: Vec<EmergencyAlert>) {
        let mut alerts = self.alerts.write();
        let mut inserted = 0usize;
        let mut advanced = 0usize;

        for incoming in remote {
            match alerts.get_mut(&incoming.id) {
                None => {
                    alerts.insert(incoming.id, incoming);
                    inserted += 1;
                }
                Some(existing) => {
                    if incoming.status > existing.status {
                        advanced += 1;
                    }
                    if incoming.status >= existing.status {
                        *existing = incoming;
                    }
                }
            }
        }

        if inserted > 0 || advanced > 0 {
            debug!(inserted = %inserted, advanced = %advanced, "alert_feed_merged");
        }
    }
}

/// Handle to the running alert refresh task
pub struct AlertRefreshHandle {
    task: JoinHandle<()>,
}

impl AlertRefreshHandle {
    pub fn stop(self) {
        self.task.abort();
        info!("alert_refresh_stopped");
    }
}

/// Start periodic refresh of the feed from GET /sos_alerts
pub fn start_alert_refresh(
    api: TempleApi,
    feed: Arc<AlertFeed>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> AlertRefreshHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match api.sos_alerts().await {
                        Ok(alerts) => feed.merge_remote(alerts),
                        Err(e) => warn!(error = %e, "sos_alerts_refresh_failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("alert_refresh_shutdown");
                        return;
                    }
                }
            }
        }
    });

    info!(interval_ms = %interval.as_millis(), "alert_refresh_started");
    AlertRefreshHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alert(id: i64, status: AlertStatus, secs: i64) -> EmergencyAlert {
        EmergencyAlert {
            id: AlertId(id),
            created_at: Utc.timestamp_opt(1_730_000_000 + secs, 0).unwrap(),
            lat: 20.888,
            lon: 70.4013,
            status,
            description: None,
        }
    }

    #[test]
    fn test_acknowledge_new_alert() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::New, 0));

        assert_eq!(feed.acknowledge(AlertId(1)).unwrap(), Transition::Applied);
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::Acknowledged);
    }

    #[test]
    fn test_reacknowledge_is_noop() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::Acknowledged, 0));

        assert_eq!(feed.acknowledge(AlertId(1)).unwrap(), Transition::NoOp);
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::Acknowledged);
    }

    #[test]
    fn test_resolve_acknowledged_alert() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::Acknowledged, 0));

        assert_eq!(feed.resolve(AlertId(1)).unwrap(), Transition::Applied);
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::Resolved);
    }

    #[test]
    fn test_resolve_new_alert_rejected() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::New, 0));

        let err = feed.resolve(AlertId(1)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                id: AlertId(1),
                from: AlertStatus::New,
                to: AlertStatus::Resolved,
            }
        );
        // No partial mutation
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::New);
    }

    #[test]
    fn test_transition_on_unknown_id() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::New, 0));

        let err = feed.acknowledge(AlertId(99)).unwrap_err();
        assert_eq!(err, TransitionError::NotFound(AlertId(99)));
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::New);
    }

    #[test]
    fn test_acknowledge_resolved_alert_rejected() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::Resolved, 0));

        let err = feed.acknowledge(AlertId(1)).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_list_newest_first() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::New, 0));
        feed.insert(alert(2, AlertStatus::New, 10));
        feed.insert(alert(3, AlertStatus::New, 5));

        let ids: Vec<i64> = feed.list().iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_active_excludes_resolved() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::Resolved, 0));
        feed.insert(alert(2, AlertStatus::New, 1));
        feed.insert(alert(3, AlertStatus::Acknowledged, 2));

        let active = feed.active();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|a| a.status != AlertStatus::Resolved));
    }

    #[test]
    fn test_merge_remote_inserts_unknown() {
        let feed = AlertFeed::new();
        feed.merge_remote(vec![alert(1, AlertStatus::New, 0), alert(2, AlertStatus::New, 1)]);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_merge_remote_never_regresses_status() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::New, 0));
        feed.acknowledge(AlertId(1)).unwrap();

        // Stale snapshot taken before the local acknowledge
        feed.merge_remote(vec![alert(1, AlertStatus::New, 0)]);
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::Acknowledged);

        // Snapshot where the server is ahead advances the alert
        feed.merge_remote(vec![alert(1, AlertStatus::Resolved, 0)]);
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::Resolved);
    }

    #[test]
    fn test_merge_remote_keeps_missing_alerts() {
        let feed = AlertFeed::new();
        feed.insert(alert(1, AlertStatus::New, 0));
        feed.merge_remote(vec![alert(2, AlertStatus::New, 1)]);
        // Alert 1 was absent from the snapshot but is never deleted
        assert_eq!(feed.len(), 2);
        assert!(feed.get(AlertId(1)).is_some());
    }
}
