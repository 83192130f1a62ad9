//! Dashboard views
//!
//! Composes the poller, classifier, alert feed and canvas into the pilgrim-
//! and staff-facing screens. Views are thin: they derive a [`CrowdSummary`]
//! per render and drive the canvas overlays; all state lives in the feed
//! services passed in, never in closures.

use crate::domain::alert::EmergencyAlert;
use crate::domain::classify::{classify, prescriptive, Classification, Prescription};
use crate::domain::types::{AlertId, FacilityPoint, OccupancySample};
use crate::services::alert_feed::{AlertFeed, Transition};
use crate::services::canvas::{MapRegistry, MapSurface};
use tracing::debug;

/// Derived view-model for the summary cards.
///
/// Recomputed from the current sample on every render; the classification is
/// never cached between polls.
#[derive(Debug, Clone)]
pub struct CrowdSummary {
    pub count: Option<u32>,
    pub classification: Option<Classification>,
    pub prescription: Option<Prescription>,
}

impl CrowdSummary {
    pub fn from_sample(sample: Option<&OccupancySample>) -> Self {
        match sample {
            Some(s) => Self {
                count: Some(s.count),
                classification: Some(classify(s.count)),
                prescription: Some(prescriptive(s.count)),
            },
            None => Self { count: None, classification: None, prescription: None },
        }
    }

    /// Pilgrim-facing count text; "Unavailable" only before the first sample
    pub fn count_text(&self) -> String {
        match self.count {
            Some(count) => count.to_string(),
            None => "Unavailable".to_string(),
        }
    }

    pub fn wait_text(&self) -> &'static str {
        self.classification.map(|c| c.wait_estimate).unwrap_or("Unavailable")
    }

    pub fn comfort_text(&self) -> &'static str {
        self.classification.map(|c| c.comfort.as_str()).unwrap_or("Unavailable")
    }
}

/// Pilgrim-facing screen: summary cards plus the facility intensity overlay
pub struct PilgrimView {
    view_id: String,
    facilities: Vec<FacilityPoint>,
    mounted: bool,
}

impl PilgrimView {
    pub fn new(facilities: Vec<FacilityPoint>) -> Self {
        Self { view_id: "pilgrim_map".to_string(), facilities, mounted: false }
    }

    pub fn mount<F>(&mut self, registry: &mut MapRegistry, surface: F)
    where
        F: FnOnce() -> Box<dyn MapSurface>,
    {
        registry.acquire(&self.view_id, surface);
        self.mounted = true;
    }

    /// Derive the summary and redraw the intensity overlay.
    ///
    /// After unmount this is a no-op on the map: a late sample cannot
    /// resurrect a released canvas.
    pub fn render(
        &mut self,
        registry: &mut MapRegistry,
        sample: Option<&OccupancySample>,
    ) -> CrowdSummary {
        let summary = CrowdSummary::from_sample(sample);
        if self.mounted {
            if let Some(canvas) = registry.get_mut(&self.view_id) {
                canvas.update_intensity(&self.facilities, sample);
            }
        }
        summary
    }

    pub fn unmount(&mut self, registry: &mut MapRegistry) {
        registry.release(&self.view_id);
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

/// Staff-facing screen: summary, intensity overlay, alert overlay and the
/// acknowledge/resolve actions
pub struct StaffView {
    view_id: String,
    facilities: Vec<FacilityPoint>,
    mounted: bool,
}

impl StaffView {
    pub fn new(facilities: Vec<FacilityPoint>) -> Self {
        Self { view_id: "staff_dashboard".to_string(), facilities, mounted: false }
    }

    pub fn mount<F>(&mut self, registry: &mut MapRegistry, surface: F)
    where
        F: FnOnce() -> Box<dyn MapSurface>,
    {
        registry.acquire(&self.view_id, surface);
        self.mounted = true;
    }

    /// Derive the summary and redraw both overlays
    pub fn render(
        &mut self,
        registry: &mut MapRegistry,
        sample: Option<&OccupancySample>,
        alerts: &[EmergencyAlert],
    ) -> CrowdSummary {
        let summary = CrowdSummary::from_sample(sample);
        if self.mounted {
            if let Some(canvas) = registry.get_mut(&self.view_id) {
                canvas.update_intensity(&self.facilities, sample);
                canvas.update_alerts(alerts);
            }
        }
        summary
    }

    /// Acknowledge an alert, surfacing a failure as an inline message with
    /// the feed unchanged
    pub fn acknowledge_alert(&self, feed: &AlertFeed, id: AlertId) -> Result<Transition, String> {
        feed.acknowledge(id).map_err(|e| {
            debug!(alert_id = %id, error = %e, "acknowledge_rejected");
            e.to_string()
        })
    }

    /// Resolve an alert, surfacing a failure as an inline message with the
    /// feed unchanged
    pub fn resolve_alert(&self, feed: &AlertFeed, id: AlertId) -> Result<Transition, String> {
        feed.resolve(id).map_err(|e| {
            debug!(alert_id = %id, error = %e, "resolve_rejected");
            e.to_string()
        })
    }

    pub fn unmount(&mut self, registry: &mut MapRegistry) {
        registry.release(&self.view_id);
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertStatus;
    use crate::domain::classify::{ComfortLevel, Severity};
    use crate::domain::types::LocationId;
    use crate::infra::Config;
    use crate::services::canvas::{InMemorySurface, MarkerKind};
    use chrono::Utc;

    fn sample(count: u32) -> OccupancySample {
        OccupancySample {
            count,
            observed_at: Utc::now(),
            location_id: LocationId::from("main_entrance"),
        }
    }

    #[test]
    fn test_summary_unavailable_before_first_sample() {
        let summary = CrowdSummary::from_sample(None);
        assert_eq!(summary.count_text(), "Unavailable");
        assert_eq!(summary.wait_text(), "Unavailable");
        assert!(summary.classification.is_none());
    }

    #[test]
    fn test_summary_from_sample() {
        let s = sample(275);
        let summary = CrowdSummary::from_sample(Some(&s));
        assert_eq!(summary.count_text(), "275");
        assert_eq!(summary.wait_text(), "30-45 minutes");
        assert_eq!(summary.comfort_text(), "Moderate");
    }

    #[test]
    fn test_end_to_end_staff_dashboard() {
        let config = Config::default();
        let mut registry = MapRegistry::new(config.clone());
        let surface = InMemorySurface::new();
        let feed = AlertFeed::new();
        let mut view = StaffView::new(config.facilities().to_vec());

        let mount_surface = surface.clone();
        view.mount(&mut registry, move || Box::new(mount_surface));

        // Poll returns 275 -> Moderate comfort, High severity, red marker
        let s = sample(275);
        let summary = view.render(&mut registry, Some(&s), &feed.active());
        assert_eq!(summary.classification.unwrap().comfort, ComfortLevel::Moderate);
        assert_eq!(summary.classification.unwrap().severity, Severity::High);
        assert_eq!(summary.wait_text(), "30-45 minutes");

        let live = surface
            .markers_of_kind(MarkerKind::Intensity)
            .into_iter()
            .find(|m| m.label == "Main Entrance")
            .unwrap();
        assert_eq!(live.color, "#F44336");

        // SOS comes in: rendered red, status new
        feed.insert(EmergencyAlert::new(AlertId(1), 20.888, 70.4013, None));
        feed.insert(EmergencyAlert::new(AlertId(2), 20.884, 70.4085, None));
        view.render(&mut registry, Some(&s), &feed.active());

        let alerts = surface.markers_of_kind(MarkerKind::Alert);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|m| m.color == "red"));

        // Acknowledge turns it orange without touching the other alert
        assert_eq!(view.acknowledge_alert(&feed, AlertId(1)).unwrap(), Transition::Applied);
        view.render(&mut registry, Some(&s), &feed.active());

        let alerts = surface.markers_of_kind(MarkerKind::Alert);
        let first = alerts.iter().find(|m| m.label == "SOS Alert #1").unwrap();
        let second = alerts.iter().find(|m| m.label == "SOS Alert #2").unwrap();
        assert_eq!(first.color, "orange");
        assert_eq!(second.color, "red");
    }

    #[test]
    fn test_failed_action_leaves_feed_unchanged() {
        let config = Config::default();
        let feed = AlertFeed::new();
        let view = StaffView::new(config.facilities().to_vec());
        feed.insert(EmergencyAlert::new(AlertId(1), 0.0, 0.0, None));

        // Resolve before acknowledge is surfaced as an inline message
        let message = view.resolve_alert(&feed, AlertId(1)).unwrap_err();
        assert!(message.contains("cannot move"));
        assert_eq!(feed.get(AlertId(1)).unwrap().status, AlertStatus::New);

        let message = view.acknowledge_alert(&feed, AlertId(42)).unwrap_err();
        assert!(message.contains("not found"));
    }

    #[test]
    fn test_unmount_releases_map_and_late_render_is_noop() {
        let config = Config::default();
        let mut registry = MapRegistry::new(config.clone());
        let surface = InMemorySurface::new();
        let mut view = PilgrimView::new(config.facilities().to_vec());

        let mount_surface = surface.clone();
        view.mount(&mut registry, move || Box::new(mount_surface));
        view.render(&mut registry, Some(&sample(100)));
        assert_eq!(surface.marker_count(), 3);

        view.unmount(&mut registry);
        assert!(!view.is_mounted());
        assert!(surface.is_destroyed());

        // A late sample arriving after unmount draws nothing
        view.render(&mut registry, Some(&sample(400)));
        assert_eq!(surface.marker_count(), 0);
        assert!(!registry.contains("pilgrim_map"));
    }

    #[test]
    fn test_remount_after_unmount_creates_fresh_canvas() {
        let config = Config::default();
        let mut registry = MapRegistry::new(config.clone());
        let mut view = PilgrimView::new(config.facilities().to_vec());

        let first = InMemorySurface::new();
        let s = first.clone();
        view.mount(&mut registry, move || Box::new(s));
        view.unmount(&mut registry);

        let second = InMemorySurface::new();
        let s = second.clone();
        view.mount(&mut registry, move || Box::new(s));
        view.render(&mut registry, Some(&sample(100)));

        assert!(first.is_destroyed());
        assert_eq!(first.marker_count(), 0);
        assert_eq!(second.marker_count(), 3);
    }
}
