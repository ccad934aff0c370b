//! Clinic search state for the locator page: a list of hits, a map center
//! and one selected clinic shared between list and map.

use crate::models::clinic_types::{BoundingBox, LatLng, Place};
use crate::services::geocoder::Geocoder;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const CLINIC_RESULT_LIMIT: usize = 30;
pub const DEFAULT_CENTER: LatLng = LatLng::new(40.7128, -74.006);
pub const DEFAULT_ZOOM: u8 = 13;
pub const LOCATED_ZOOM: u8 = 14;
/// Half-width in degrees of the box searched around a device position.
pub const VIEWBOX_DELTA: f64 = 0.1;
pub const LOCATION_ERROR_MSG: &str = "Could not get your location.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "count", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Blank query, nothing was sent.
    Skipped,
    /// The place name did not resolve; nothing else was searched.
    NoMatch,
    Found(usize),
    /// A lookup failed; the list was left as it was.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicEntry {
    pub index: usize,
    pub title: String,
    pub display_name: String,
    pub position: LatLng,
    pub selected: bool,
    pub directions_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatorSnapshot {
    pub query: String,
    pub center: LatLng,
    pub zoom: u8,
    pub loading: bool,
    pub summary: String,
    pub clinics: Vec<ClinicEntry>,
}

pub fn directions_url(place: &Place) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={},{}",
        place.lat, place.lon
    )
}

#[derive(Debug)]
pub struct ClinicLocator {
    query: String,
    clinics: Vec<Arc<Place>>,
    center: LatLng,
    zoom: u8,
    selected: Option<Arc<Place>>,
    loading: bool,
}

impl Default for ClinicLocator {
    fn default() -> Self {
        Self {
            query: String::new(),
            clinics: Vec::new(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            selected: None,
            loading: false,
        }
    }
}

impl ClinicLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `query` to a location, then searches for clinics around it.
    /// The two lookups run one after the other.
    pub async fn search(&mut self, geocoder: &dyn Geocoder, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Skipped;
        }
        self.query = query.to_string();
        self.loading = true;
        let outcome = self.run_search(geocoder, query).await;
        self.loading = false;
        outcome
    }

    async fn run_search(&mut self, geocoder: &dyn Geocoder, query: &str) -> SearchOutcome {
        let location = match geocoder.geocode(query).await {
            Ok(places) => places.into_iter().next(),
            Err(e) => {
                warn!(query, error = %e, "geocoding failed");
                return SearchOutcome::Failed;
            }
        };

        let Some(location) = location else {
            info!(query, "no location match");
            return SearchOutcome::NoMatch;
        };
        self.center = location.position();

        match geocoder.search_near(query, CLINIC_RESULT_LIMIT).await {
            Ok(found) => self.replace_clinics(found),
            Err(e) => {
                warn!(query, error = %e, "clinic search failed");
                SearchOutcome::Failed
            }
        }
    }

    /// Device-location entry point: skips geocoding and searches a bounded
    /// box around the raw coordinates.
    pub async fn search_from_position(&mut self, geocoder: &dyn Geocoder, position: LatLng) -> SearchOutcome {
        self.center = position;
        self.zoom = LOCATED_ZOOM;
        self.loading = true;

        let bbox = BoundingBox::around(position, VIEWBOX_DELTA);
        let outcome = match geocoder.search_viewbox(bbox, CLINIC_RESULT_LIMIT).await {
            Ok(found) => self.replace_clinics(found),
            Err(e) => {
                warn!(?position, error = %e, "nearby clinic search failed");
                SearchOutcome::Failed
            }
        };
        self.loading = false;
        outcome
    }

    /// The device refused or failed to give a position. Returns the alert text.
    pub fn report_location_error(&mut self, reason: &str) -> &'static str {
        warn!(reason, "device location unavailable");
        self.loading = false;
        LOCATION_ERROR_MSG
    }

    fn replace_clinics(&mut self, found: Vec<Place>) -> SearchOutcome {
        let mut found = found;
        found.truncate(CLINIC_RESULT_LIMIT);
        self.clinics = found.into_iter().map(Arc::new).collect();
        self.selected = None;
        info!(count = self.clinics.len(), "clinics found");
        SearchOutcome::Found(self.clinics.len())
    }

    /// List click: select and recenter on the clinic.
    pub fn select_from_list(&mut self, index: usize) -> Option<Arc<Place>> {
        let place = self.clinics.get(index)?.clone();
        self.center = place.position();
        self.selected = Some(place.clone());
        Some(place)
    }

    /// Marker click: select without moving the map.
    pub fn select_from_marker(&mut self, index: usize) -> Option<Arc<Place>> {
        let place = self.clinics.get(index)?.clone();
        self.selected = Some(place.clone());
        Some(place)
    }

    /// Identity comparison, so two clinics with equal data never both light up.
    pub fn is_selected(&self, place: &Arc<Place>) -> bool {
        self.selected
            .as_ref()
            .map(|s| Arc::ptr_eq(s, place))
            .unwrap_or(false)
    }

    pub fn selected(&self) -> Option<&Arc<Place>> {
        self.selected.as_ref()
    }

    pub fn clinics(&self) -> &[Arc<Place>] {
        &self.clinics
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn summary(&self) -> String {
        if self.clinics.is_empty() {
            "Search to find clinics".to_string()
        } else {
            format!("Found {} Clinics", self.clinics.len())
        }
    }

    pub fn snapshot(&self) -> LocatorSnapshot {
        LocatorSnapshot {
            query: self.query.clone(),
            center: self.center,
            zoom: self.zoom,
            loading: self.loading,
            summary: self.summary(),
            clinics: self
                .clinics
                .iter()
                .enumerate()
                .map(|(index, place)| ClinicEntry {
                    index,
                    title: place.title().to_string(),
                    display_name: place.display_name.clone(),
                    position: place.position(),
                    selected: self.is_selected(place),
                    directions_url: directions_url(place),
                })
                .collect(),
        }
    }
}
