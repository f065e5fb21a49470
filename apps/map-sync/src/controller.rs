//! Marker and view state for the dual map page.
//!
//! [`MapSyncController`] owns both views and the ordered location list. Every
//! mutation runs to completion inside one call and hands back the side effects
//! it needs from the outside world (table redraw, store requests, alerts) as
//! [`Command`]s, so the state here is always the source of truth and the store
//! only ever catches up with it.

use crate::geo::{LatLng, LatLngBounds};
use crate::view::{MapView, MarkerHandle, Tooltip};
use thiserror::Error;

pub const INVALID_INPUT_ALERT: &str = "Please enter valid latitude and longitude values.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSide {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A view finished a pan or zoom.
    ViewMoved(ViewSide),
    MarkerAdded { position: LatLng, index: u64 },
    MapClicked(LatLng),
    ManualEntrySubmitted { latitude: String, longitude: String },
    MarkerRemoveRequested(u64),
    ClearRequested,
    ZoomSliderChanged(u8),
    LocationsLoaded(Vec<LatLng>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RenderTable(Vec<TableRow>),
    SaveLocation(LatLng),
    RemoveLocation(LatLng),
    ClearAll,
    Alert(String),
    ResetInputs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRecord {
    pub position: LatLng,
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub index: u64,
    pub latitude: String,
    pub longitude: String,
}

impl TableRow {
    fn from_record(record: &LocationRecord) -> Self {
        Self {
            index: record.index,
            latitude: format!("{:.5}", record.position.lat),
            longitude: format!("{:.5}", record.position.lng),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} {raw:?} is not a number")]
    NotANumber { field: &'static str, raw: String },
}

pub fn parse_coordinate(field: &'static str, raw: &str) -> Result<f64, InputError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::NotANumber {
            field,
            raw: raw.to_string(),
        })
}

#[derive(Debug, Clone, Copy)]
struct MarkerPair {
    primary: MarkerHandle,
    secondary: MarkerHandle,
    index: u64,
}

pub struct MapSyncController<V: MapView> {
    primary: V,
    secondary: V,
    locations: Vec<LocationRecord>,
    markers: Vec<MarkerPair>,
    bounds: LatLngBounds,
}

impl<V: MapView> MapSyncController<V> {
    pub fn new(primary: V, secondary: V) -> Self {
        Self {
            primary,
            secondary,
            locations: Vec::new(),
            markers: Vec::new(),
            bounds: LatLngBounds::empty(),
        }
    }

    pub fn dispatch(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::ViewMoved(source) => {
                self.sync_views(source);
                Vec::new()
            }
            Event::MarkerAdded { position, index } => self.add_location(position, index),
            Event::MapClicked(position) => match self.next_index() {
                Some(index) => self.add_location(position, index),
                None => Vec::new(),
            },
            Event::ManualEntrySubmitted {
                latitude,
                longitude,
            } => self.submit_manual_entry(&latitude, &longitude),
            Event::MarkerRemoveRequested(index) => self.remove_location(index),
            Event::ClearRequested => self.clear_all(),
            Event::ZoomSliderChanged(zoom) => {
                self.set_zoom(zoom);
                Vec::new()
            }
            Event::LocationsLoaded(positions) => self.load_locations(positions),
        }
    }

    /// Next index: one past the last record's index, or 0 when empty.
    ///
    /// Removing the last record and adding again reissues its index. `None`
    /// once the last record already holds `u64::MAX`; the add is refused.
    pub fn next_index(&self) -> Option<u64> {
        let Some(last) = self.locations.last() else {
            return Some(0);
        };
        let next = last.index.checked_add(1);
        if next.is_none() {
            tracing::warn!(last = last.index, "location index space exhausted; add refused");
        }
        next
    }

    pub fn add_location(&mut self, position: LatLng, index: u64) -> Vec<Command> {
        let tooltip = Tooltip::for_position(position);
        let primary = self.primary.add_marker(position, tooltip.clone());
        let secondary = self.secondary.add_marker(position, tooltip);

        self.markers.push(MarkerPair {
            primary,
            secondary,
            index,
        });
        self.locations.push(LocationRecord { position, index });
        let mut commands = vec![Command::RenderTable(self.render_table())];

        self.bounds.extend(position);
        commands.push(Command::SaveLocation(position));

        self.primary.fit_bounds(&self.bounds);
        self.secondary.fit_bounds(&self.bounds);

        tracing::debug!(index, lat = position.lat, lng = position.lng, "location added");
        commands
    }

    pub fn remove_location(&mut self, index: u64) -> Vec<Command> {
        let Some(slot) = self.markers.iter().position(|pair| pair.index == index) else {
            tracing::debug!(index, "remove requested for unknown index");
            return Vec::new();
        };
        let pair = self.markers.remove(slot);

        let recorded = self
            .locations
            .iter()
            .find(|record| record.index == index)
            .map(|record| record.position);
        // The store matches by coordinate, so send what the marker actually shows.
        let removed_at = self.primary.marker_position(pair.primary).or(recorded);

        self.primary.remove_marker(pair.primary);
        self.secondary.remove_marker(pair.secondary);
        self.locations.retain(|record| record.index != index);

        let mut commands = vec![Command::RenderTable(self.render_table())];
        if let Some(position) = removed_at {
            commands.push(Command::RemoveLocation(position));
        }

        self.bounds = LatLngBounds::from_points(
            self.markers
                .iter()
                .filter_map(|pair| self.primary.marker_position(pair.primary)),
        );
        self.primary.fit_bounds(&self.bounds);
        self.secondary.fit_bounds(&self.bounds);

        tracing::debug!(index, remaining = self.locations.len(), "location removed");
        commands
    }

    /// Drops every marker and record. The viewport stays where it is.
    pub fn clear_all(&mut self) -> Vec<Command> {
        self.locations.clear();
        for pair in self.markers.drain(..) {
            self.primary.remove_marker(pair.primary);
            self.secondary.remove_marker(pair.secondary);
        }
        self.bounds = LatLngBounds::empty();

        tracing::debug!("all locations cleared");
        vec![Command::ClearAll, Command::RenderTable(self.render_table())]
    }

    pub fn render_table(&self) -> Vec<TableRow> {
        self.locations.iter().map(TableRow::from_record).collect()
    }

    pub fn submit_manual_entry(&mut self, latitude: &str, longitude: &str) -> Vec<Command> {
        let parsed = parse_coordinate("latitude", latitude)
            .and_then(|lat| parse_coordinate("longitude", longitude).map(|lng| LatLng::new(lat, lng)));

        match parsed {
            Ok(position) => {
                let Some(index) = self.next_index() else {
                    return Vec::new();
                };
                let mut commands = self.add_location(position, index);
                commands.push(Command::ResetInputs);
                commands
            }
            Err(err) => {
                tracing::debug!(error = %err, "manual entry rejected");
                vec![Command::Alert(INVALID_INPUT_ALERT.to_string())]
            }
        }
    }

    /// Seeds the list from the store; each entry gets its position in the list as index.
    pub fn load_locations(&mut self, positions: Vec<LatLng>) -> Vec<Command> {
        let mut commands = Vec::new();
        let Some(base) = self.next_index() else {
            return commands;
        };
        let total = positions.len();
        for (offset, position) in (0u64..).zip(positions) {
            let Some(index) = base.checked_add(offset) else {
                tracing::warn!(loaded = offset, total, "location index space exhausted; rest of load skipped");
                break;
            };
            commands.extend(self.add_location(position, index));
        }
        commands
    }

    /// Applies the source view's (center, zoom) to the other view.
    pub fn sync_views(&mut self, source: ViewSide) {
        let (from, to) = match source {
            ViewSide::Primary => (&self.primary, &mut self.secondary),
            ViewSide::Secondary => (&self.secondary, &mut self.primary),
        };
        let state = from.view_state();
        if to.view_state() != state {
            to.set_view(state.center, state.zoom);
        }
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.primary.set_zoom(zoom);
        self.secondary.set_zoom(zoom);
    }

    pub fn locations(&self) -> &[LocationRecord] {
        &self.locations
    }

    pub fn marker_indices(&self) -> Vec<u64> {
        self.markers.iter().map(|pair| pair.index).collect()
    }

    pub fn bounds(&self) -> &LatLngBounds {
        &self.bounds
    }

    pub fn view(&self, side: ViewSide) -> &V {
        match side {
            ViewSide::Primary => &self.primary,
            ViewSide::Secondary => &self.secondary,
        }
    }

    pub fn view_mut(&mut self, side: ViewSide) -> &mut V {
        match side {
            ViewSide::Primary => &mut self.primary,
            ViewSide::Secondary => &mut self.secondary,
        }
    }
}
