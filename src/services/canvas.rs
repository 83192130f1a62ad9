//! Geospatial canvas
//!
//! Owns exactly one live map surface per mounted view and performs the
//! differential redraw of the two marker overlays: intensity (facility
//! points colored by the occupancy ladder) and alerts (SOS markers colored
//! by status). On any update of either source, all previously drawn markers
//! of that kind - and only that kind - are removed, then exactly one marker
//! per current entity is drawn, so markers never accumulate.
//!
//! The actual drawing primitives (tile layer, marker rendering) are behind
//! the [`MapSurface`] trait; this module drives them but does not implement
//! a renderer. [`InMemorySurface`] records draw calls for headless views,
//! the TUI and tests.

use crate::domain::alert::EmergencyAlert;
use crate::domain::classify::classify;
use crate::domain::types::{FacilityPoint, OccupancySample};
use crate::infra::config::Config;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Share of the observed count attributed to facilities without a live
/// reading of their own, so the overlay is never empty while a signal exists
const FALLBACK_INTENSITY_SHARE: f64 = 0.3;

/// Marker radius bounds in pixels; extreme counts never overflow the viewport
const MIN_MARKER_RADIUS: f64 = 10.0;
const MAX_MARKER_RADIUS: f64 = 30.0;

/// Intensity attributed to a facility for the current sample.
///
/// The facility the sample was observed at gets the live count; every other
/// facility gets the fallback share of it. Returns the count and whether it
/// is live. Single derivation for every intensity consumer (canvas, TUI).
pub fn facility_intensity(facility: &FacilityPoint, sample: &OccupancySample) -> (u32, bool) {
    if facility.id == sample.location_id {
        (sample.count, true)
    } else {
        ((sample.count as f64 * FALLBACK_INTENSITY_SHARE).floor() as u32, false)
    }
}

/// Newtype wrapper for drawn-marker identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    fn next() -> Self {
        MarkerId(Uuid::now_v7())
    }
}

/// The two independently updated overlay classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Intensity,
    Alert,
}

/// One drawn map marker. The canvas owns these; never domain entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub lat: f64,
    pub lon: f64,
    pub color: &'static str,
    pub radius: f64,
    pub label: String,
    pub detail: String,
}

/// Seam to the map-drawing primitives.
///
/// Implementations render however they like (browser tiles, terminal, test
/// recorder); the canvas only promises to call them single-writer.
pub trait MapSurface: Send {
    fn set_view(&mut self, lat: f64, lon: f64, zoom: u8);
    fn add_tile_layer(&mut self, url: &str, attribution: &str);
    fn draw_marker(&mut self, marker: Marker) -> MarkerId;
    fn remove_marker(&mut self, id: MarkerId);
    /// Release every surface resource; further calls are undefined
    fn destroy(&mut self);
}

#[derive(Debug, Default)]
struct SurfaceState {
    view: Option<(f64, f64, u8)>,
    tile_layers: usize,
    markers: HashMap<MarkerId, Marker>,
    destroyed: bool,
}

/// Recording surface for headless views, the TUI and tests.
///
/// Clones share state, so a view can hold the drawing end while the TUI
/// reads the drawn marker set.
#[derive(Debug, Clone, Default)]
pub struct InMemorySurface {
    state: Arc<RwLock<SurfaceState>>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.state.read().markers.values().cloned().collect()
    }

    pub fn markers_of_kind(&self, kind: MarkerKind) -> Vec<Marker> {
        let mut markers: Vec<Marker> =
            self.state.read().markers.values().filter(|m| m.kind == kind).cloned().collect();
        markers.sort_by(|a, b| a.label.cmp(&b.label));
        markers
    }

    pub fn marker_count(&self) -> usize {
        self.state.read().markers.len()
    }

    pub fn tile_layers(&self) -> usize {
        self.state.read().tile_layers
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.read().destroyed
    }
}

impl MapSurface for InMemorySurface {
    fn set_view(&mut self, lat: f64, lon: f64, zoom: u8) {
        self.state.write().view = Some((lat, lon, zoom));
    }

    fn add_tile_layer(&mut self, _url: &str, _attribution: &str) {
        self.state.write().tile_layers += 1;
    }

    fn draw_marker(&mut self, marker: Marker) -> MarkerId {
        let id = MarkerId::next();
        self.state.write().markers.insert(id, marker);
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.state.write().markers.remove(&id);
    }

    fn destroy(&mut self) {
        let mut state = self.state.write();
        state.markers.clear();
        state.tile_layers = 0;
        state.destroyed = true;
    }
}

/// One live map with its two overlays
pub struct CrowdCanvas {
    surface: Box<dyn MapSurface>,
    intensity_ids: Vec<MarkerId>,
    alert_ids: Vec<MarkerId>,
}

impl CrowdCanvas {
    /// Create the canvas and render the base layer exactly once
    fn new(mut surface: Box<dyn MapSurface>, config: &Config) -> Self {
        let (lat, lon) = config.map_center();
        surface.set_view(lat, lon, config.map_zoom());
        surface.add_tile_layer(config.tile_url(), config.tile_attribution());
        Self { surface, intensity_ids: Vec::new(), alert_ids: Vec::new() }
    }

    /// Redraw the intensity overlay from the current facilities and sample.
    ///
    /// The facility the sample was observed at gets the live count; every
    /// other facility falls back to 30% of it rather than being omitted.
    /// With no sample ever observed the overlay stays empty.
    pub fn update_intensity(&mut self, facilities: &[FacilityPoint], sample: Option<&OccupancySample>) {
        for id in self.intensity_ids.drain(..) {
            self.surface.remove_marker(id);
        }

        let Some(sample) = sample else {
            return;
        };

        for facility in facilities {
            let (intensity, is_observed) = facility_intensity(facility, sample);
            let classification = classify(intensity);

            let marker = Marker {
                kind: MarkerKind::Intensity,
                lat: facility.lat,
                lon: facility.lon,
                color: classification.severity.color(),
                radius: (intensity as f64 / 20.0).clamp(MIN_MARKER_RADIUS, MAX_MARKER_RADIUS),
                label: facility.name.clone(),
                detail: format!(
                    "Current Count: {} ({})",
                    intensity,
                    if is_observed { "Live Data" } else { "Estimated" }
                ),
            };
            self.intensity_ids.push(self.surface.draw_marker(marker));
        }

        debug!(markers = %self.intensity_ids.len(), "intensity_overlay_redrawn");
    }

    /// Redraw the alert overlay. Intensity markers are untouched.
    pub fn update_alerts(&mut self, alerts: &[EmergencyAlert]) {
        for id in self.alert_ids.drain(..) {
            self.surface.remove_marker(id);
        }

        for alert in alerts {
            let marker = Marker {
                kind: MarkerKind::Alert,
                lat: alert.lat,
                lon: alert.lon,
                color: alert.status.color(),
                radius: MIN_MARKER_RADIUS,
                label: format!("SOS Alert #{}", alert.id),
                detail: format!(
                    "Status: {} ({})",
                    alert.status.as_str(),
                    alert.description.as_deref().unwrap_or("no description")
                ),
            };
            self.alert_ids.push(self.surface.draw_marker(marker));
        }

        debug!(markers = %self.alert_ids.len(), "alert_overlay_redrawn");
    }

    pub fn intensity_marker_count(&self) -> usize {
        self.intensity_ids.len()
    }

    pub fn alert_marker_count(&self) -> usize {
        self.alert_ids.len()
    }

    /// Remove all markers and release the surface
    fn teardown(&mut self) {
        for id in self.intensity_ids.drain(..) {
            self.surface.remove_marker(id);
        }
        for id in self.alert_ids.drain(..) {
            self.surface.remove_marker(id);
        }
        self.surface.destroy();
    }
}

/// Owns at most one live canvas per mounted view.
///
/// `acquire` is create-if-absent, so double-mounting a view cannot create a
/// second map; `release` is the mandatory teardown path and is a no-op for
/// unknown views.
pub struct MapRegistry {
    config: Config,
    canvases: HashMap<String, CrowdCanvas>,
}

impl MapRegistry {
    pub fn new(config: Config) -> Self {
        Self { config, canvases: HashMap::new() }
    }

    /// Get the view's canvas, creating it (and its base layer) on first call.
    ///
    /// The surface factory is only invoked when the canvas does not exist yet.
    pub fn acquire<F>(&mut self, view_id: &str, surface: F) -> &mut CrowdCanvas
    where
        F: FnOnce() -> Box<dyn MapSurface>,
    {
        if !self.canvases.contains_key(view_id) {
            info!(view = %view_id, "map_acquired");
            let canvas = CrowdCanvas::new(surface(), &self.config);
            self.canvases.insert(view_id.to_string(), canvas);
        }
        self.canvases.get_mut(view_id).expect("canvas inserted above")
    }

    /// Borrow an already-acquired canvas
    pub fn get_mut(&mut self, view_id: &str) -> Option<&mut CrowdCanvas> {
        self.canvases.get_mut(view_id)
    }

    pub fn contains(&self, view_id: &str) -> bool {
        self.canvases.contains_key(view_id)
    }

    /// Tear down the view's map: clear markers, destroy the surface, drop
    /// the canvas. Releasing an unknown view is a no-op.
    pub fn release(&mut self, view_id: &str) {
        if let Some(mut canvas) = self.canvases.remove(view_id) {
            canvas.teardown();
            info!(view = %view_id, "map_released");
        }
    }
}
