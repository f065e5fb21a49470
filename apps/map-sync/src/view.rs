//! Map view abstraction plus the in-memory view used headless and in tests.

use crate::geo::{fit_view, LatLng, LatLngBounds, ViewportSize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub content: String,
    pub permanent: bool,
    pub opacity: f32,
}

impl Tooltip {
    /// Hover tooltip naming the marked coordinate to five decimals.
    pub fn for_position(position: LatLng) -> Self {
        Self {
            content: format!("Marked Lat: {:.5}, Long: {:.5}", position.lat, position.lng),
            permanent: false,
            opacity: 0.7,
        }
    }
}

/// One rendered map widget: its own center, zoom and markers.
///
/// Implementations record a pending "move end" whenever the visible
/// (center, zoom) actually changes; callers drain them with
/// [`MapView::take_move_end`] and feed them back as view-moved events.
pub trait MapView {
    fn label(&self) -> &str;
    fn base_layer(&self) -> BaseLayer;
    fn has_zoom_control(&self) -> bool;
    fn view_state(&self) -> ViewState;
    fn set_view(&mut self, center: LatLng, zoom: u8);
    fn set_zoom(&mut self, zoom: u8);
    /// Frames `bounds`; empty bounds leave the view as it is.
    fn fit_bounds(&mut self, bounds: &LatLngBounds);
    /// Places a marker and opens its tooltip right away.
    fn add_marker(&mut self, position: LatLng, tooltip: Tooltip) -> MarkerHandle;
    fn remove_marker(&mut self, marker: MarkerHandle) -> bool;
    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng>;
    fn marker_count(&self) -> usize;
    fn take_move_end(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseLayer {
    Street,
    Satellite,
}

impl BaseLayer {
    pub fn tile_url_template(self) -> &'static str {
        match self {
            BaseLayer::Street => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseLayer::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            BaseLayer::Street => "© OpenStreetMap contributors",
            BaseLayer::Satellite => "© ESRI © OpenStreetMap contributors",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub label: String,
    pub base_layer: BaseLayer,
    pub center: LatLng,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub zoom_control: bool,
    pub viewport: ViewportSize,
}

#[derive(Debug, Clone)]
struct PlacedMarker {
    position: LatLng,
    tooltip: Tooltip,
    tooltip_open: bool,
}

#[derive(Debug, Clone)]
pub struct HeadlessView {
    options: ViewOptions,
    state: ViewState,
    markers: BTreeMap<MarkerHandle, PlacedMarker>,
    next_marker: u64,
    pending_move_ends: usize,
}

impl HeadlessView {
    pub fn new(options: ViewOptions) -> Self {
        let zoom = options.zoom.clamp(options.min_zoom, options.max_zoom);
        let state = ViewState {
            center: options.center,
            zoom,
        };
        Self {
            options,
            state,
            markers: BTreeMap::new(),
            next_marker: 0,
            pending_move_ends: 0,
        }
    }

    pub fn tooltip(&self, marker: MarkerHandle) -> Option<&Tooltip> {
        self.markers.get(&marker).map(|m| &m.tooltip)
    }

    pub fn is_tooltip_open(&self, marker: MarkerHandle) -> bool {
        self.markers.get(&marker).is_some_and(|m| m.tooltip_open)
    }

    /// Pointer left the marker: non-permanent tooltips close.
    pub fn hover_out(&mut self, marker: MarkerHandle) {
        if let Some(placed) = self.markers.get_mut(&marker) {
            if !placed.tooltip.permanent {
                placed.tooltip_open = false;
            }
        }
    }

    pub fn pending_move_ends(&self) -> usize {
        self.pending_move_ends
    }

    fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.options.min_zoom, self.options.max_zoom)
    }

    fn move_to(&mut self, next: ViewState) {
        if next != self.state {
            self.state = next;
            self.pending_move_ends += 1;
        }
    }
}

impl MapView for HeadlessView {
    fn label(&self) -> &str {
        &self.options.label
    }

    fn base_layer(&self) -> BaseLayer {
        self.options.base_layer
    }

    fn has_zoom_control(&self) -> bool {
        self.options.zoom_control
    }

    fn view_state(&self) -> ViewState {
        self.state
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        let zoom = self.clamp_zoom(zoom);
        self.move_to(ViewState { center, zoom });
    }

    fn set_zoom(&mut self, zoom: u8) {
        let zoom = self.clamp_zoom(zoom);
        self.move_to(ViewState {
            center: self.state.center,
            zoom,
        });
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        let Some((center, zoom)) = fit_view(
            bounds,
            self.options.viewport,
            self.state.zoom,
            self.options.min_zoom,
            self.options.max_zoom,
        ) else {
            return;
        };
        self.move_to(ViewState { center, zoom });
    }

    fn add_marker(&mut self, position: LatLng, tooltip: Tooltip) -> MarkerHandle {
        let handle = MarkerHandle(self.next_marker);
        self.next_marker += 1;
        self.markers.insert(
            handle,
            PlacedMarker {
                position,
                tooltip,
                tooltip_open: true,
            },
        );
        handle
    }

    fn remove_marker(&mut self, marker: MarkerHandle) -> bool {
        self.markers.remove(&marker).is_some()
    }

    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng> {
        self.markers.get(&marker).map(|m| m.position)
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }

    fn take_move_end(&mut self) -> bool {
        if self.pending_move_ends == 0 {
            return false;
        }
        self.pending_move_ends -= 1;
        true
    }
}
