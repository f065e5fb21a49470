//! Event loop glue: feeds events to the controller, relays view move-ends and
//! executes the commands it returns.
//!
//! Everything here runs on one task. Store requests are spawned onto a
//! [`JoinSet`] after local state is already updated and are never awaited by
//! the event path; their outcome is only logged.

use crate::client::{ClientError, StoreClient, StoreReply};
use crate::controller::{Command, Event, MapSyncController, ViewSide};
use crate::geo::LatLng;
use crate::surface::{Surface, ViewSummary};
use crate::view::MapView;
use std::future::Future;
use tokio::task::JoinSet;

/// Upper bound on move-end relays per event; views that keep moving past this are left as is.
const MAX_SYNC_ROUNDS: usize = 16;

pub struct Session<V: MapView, S: Surface> {
    controller: MapSyncController<V>,
    client: StoreClient,
    surface: S,
    inflight: JoinSet<()>,
}

impl<V: MapView, S: Surface> Session<V, S> {
    pub fn new(controller: MapSyncController<V>, client: StoreClient, surface: S) -> Self {
        Self {
            controller,
            client,
            surface,
            inflight: JoinSet::new(),
        }
    }

    pub fn controller(&self) -> &MapSyncController<V> {
        &self.controller
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Fetches the saved list and replays it through the controller.
    pub async fn load_initial(&mut self) -> Result<usize, ClientError> {
        let locations = self.client.get_locations().await?;
        let count = locations.len();
        tracing::info!(count, "loaded saved locations");
        self.handle(Event::LocationsLoaded(locations));
        Ok(count)
    }

    pub fn handle(&mut self, event: Event) {
        self.reap_finished();
        let commands = self.controller.dispatch(event);
        self.execute(commands);
        self.relay_move_ends();
    }

    /// User pan/zoom gesture on one view, followed by the usual move-end sync.
    pub fn pan(&mut self, side: ViewSide, center: LatLng, zoom: Option<u8>) {
        let view = self.controller.view_mut(side);
        let zoom = zoom.unwrap_or_else(|| view.view_state().zoom);
        view.set_view(center, zoom);
        self.relay_move_ends();
    }

    pub fn show(&mut self) {
        let rows = self.controller.render_table();
        self.surface.render_table(&rows);
        let views: Vec<ViewSummary> = [ViewSide::Primary, ViewSide::Secondary]
            .into_iter()
            .map(|side| {
                let view = self.controller.view(side);
                ViewSummary {
                    label: view.label().to_string(),
                    base_layer: view.base_layer(),
                    zoom_control: view.has_zoom_control(),
                    state: view.view_state(),
                    markers: view.marker_count(),
                }
            })
            .collect();
        self.surface.render_views(&views);
    }

    /// Waits for every store request dispatched so far.
    pub async fn flush(&mut self) {
        while let Some(res) = self.inflight.join_next().await {
            if let Err(err) = res {
                tracing::warn!(error=%err, "store request task failed");
            }
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    fn reap_finished(&mut self) {
        while let Some(res) = self.inflight.try_join_next() {
            if let Err(err) = res {
                tracing::warn!(error=%err, "store request task failed");
            }
        }
    }

    fn relay_move_ends(&mut self) {
        for _ in 0..MAX_SYNC_ROUNDS {
            let mut moved = false;
            for side in [ViewSide::Primary, ViewSide::Secondary] {
                if self.controller.view_mut(side).take_move_end() {
                    moved = true;
                    let commands = self.controller.dispatch(Event::ViewMoved(side));
                    self.execute(commands);
                }
            }
            if !moved {
                return;
            }
        }
        tracing::warn!(rounds = MAX_SYNC_ROUNDS, "views still moving after sync; giving up");
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::RenderTable(rows) => self.surface.render_table(&rows),
                Command::Alert(message) => self.surface.alert(&message),
                Command::ResetInputs => self.surface.reset_inputs(),
                Command::SaveLocation(position) => {
                    let client = self.client.clone();
                    self.dispatch_request("save", async move {
                        client.save_location(position).await
                    });
                }
                Command::RemoveLocation(position) => {
                    let client = self.client.clone();
                    self.dispatch_request("remove", async move {
                        client.remove_location(position).await
                    });
                }
                Command::ClearAll => {
                    let client = self.client.clone();
                    self.dispatch_request("clear", async move { client.clear_all().await });
                }
            }
        }
    }

    fn dispatch_request<F>(&mut self, op: &'static str, request: F)
    where
        F: Future<Output = Result<StoreReply, ClientError>> + Send + 'static,
    {
        self.inflight.spawn(async move {
            match request.await {
                Ok(reply) if reply.is_success() => {
                    tracing::info!(op, message=%reply.message, "store request done");
                }
                Ok(reply) => {
                    tracing::warn!(op, status=%reply.status, message=%reply.message, "store rejected request");
                }
                Err(err) => {
                    tracing::error!(op, error=%err, "store request failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{TableRow, INVALID_INPUT_ALERT};
    use crate::geo::ViewportSize;
    use crate::view::{BaseLayer, HeadlessView, ViewOptions};
    use location_store::http::{router, HttpState};
    use location_store::store::{spawn_store_thread, Location};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSurface {
        tables: Vec<Vec<TableRow>>,
        alerts: Vec<String>,
        resets: usize,
        views: Vec<Vec<ViewSummary>>,
    }

    impl Surface for RecordingSurface {
        fn render_table(&mut self, rows: &[TableRow]) {
            self.tables.push(rows.to_vec());
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }

        fn reset_inputs(&mut self) {
            self.resets += 1;
        }

        fn render_views(&mut self, views: &[ViewSummary]) {
            self.views.push(views.to_vec());
        }
    }

    fn view(label: &str, base_layer: BaseLayer, max_zoom: u8) -> HeadlessView {
        HeadlessView::new(ViewOptions {
            label: label.to_string(),
            base_layer,
            center: LatLng::new(17.48342, 78.5173),
            zoom: 18,
            min_zoom: 0,
            max_zoom,
            zoom_control: base_layer == BaseLayer::Street,
            viewport: ViewportSize::new(800, 600),
        })
    }

    fn session_with(
        base_url: &str,
        secondary_max_zoom: u8,
    ) -> Session<HeadlessView, RecordingSurface> {
        let controller = MapSyncController::new(
            view("street", BaseLayer::Street, 19),
            view("satellite", BaseLayer::Satellite, secondary_max_zoom),
        );
        let client = StoreClient::new(base_url, Some(Duration::from_secs(5))).unwrap();
        Session::new(controller, client, RecordingSurface::default())
    }

    async fn spawn_store(dir: &TempDir, seed: &[Location]) -> String {
        let store = spawn_store_thread(dir.path().join("locations.csv")).unwrap();
        for location in seed {
            store.save(*location).await.unwrap();
        }
        let app = router(HttpState { store });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}")
    }

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn mutations_reach_the_store() {
        let dir = TempDir::new().unwrap();
        let base_url = spawn_store(&dir, &[]).await;
        let mut session = session_with(&base_url, 18);

        session.handle(Event::MapClicked(LatLng::new(17.0, 78.0)));
        session.handle(Event::MapClicked(LatLng::new(17.1, 78.1)));
        session.handle(Event::MapClicked(LatLng::new(17.2, 78.2)));
        session.flush().await;

        let client = StoreClient::new(&base_url, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(client.get_locations().await.unwrap().len(), 3);

        session.handle(Event::MarkerRemoveRequested(1));
        session.flush().await;
        assert_eq!(
            client.get_locations().await.unwrap(),
            vec![LatLng::new(17.0, 78.0), LatLng::new(17.2, 78.2)]
        );

        let last_table = session.surface().tables.last().unwrap();
        let indices: Vec<u64> = last_table.iter().map(|row| row.index).collect();
        assert_eq!(indices, vec![0, 2]);

        session.handle(Event::ClearRequested);
        session.flush().await;
        assert!(client.get_locations().await.unwrap().is_empty());
        assert!(session.surface().tables.last().unwrap().is_empty());
    }

    #[tokio::test]
    async fn initial_load_assigns_positions_and_tolerates_duplicate_saves() {
        let dir = TempDir::new().unwrap();
        let base_url = spawn_store(
            &dir,
            &[Location::new(17.0, 78.0), Location::new(17.3, 78.3)],
        )
        .await;
        let mut session = session_with(&base_url, 18);

        let loaded = session.load_initial().await.unwrap();
        session.flush().await;

        assert_eq!(loaded, 2);
        let indices: Vec<u64> = session
            .controller()
            .locations()
            .iter()
            .map(|record| record.index)
            .collect();
        assert_eq!(indices, vec![0, 1]);

        // Replayed saves are rejected as duplicates; the store is unchanged.
        let client = StoreClient::new(&base_url, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(client.get_locations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn store_failures_do_not_roll_back_local_state() {
        let mut session = session_with(&unreachable_url(), 18);

        session.handle(Event::MapClicked(LatLng::new(17.0, 78.0)));
        session.handle(Event::MapClicked(LatLng::new(17.1, 78.1)));
        session.handle(Event::MarkerRemoveRequested(0));
        assert_eq!(session.inflight(), 3);
        session.flush().await;

        assert_eq!(session.inflight(), 0);
        assert_eq!(session.controller().locations().len(), 1);
        assert_eq!(session.controller().locations()[0].index, 1);
    }

    #[tokio::test]
    async fn initial_load_failure_leaves_state_empty() {
        let mut session = session_with(&unreachable_url(), 18);
        assert!(session.load_initial().await.is_err());
        assert!(session.controller().locations().is_empty());
    }

    #[tokio::test]
    async fn invalid_entry_alerts_and_sends_nothing() {
        let mut session = session_with(&unreachable_url(), 18);

        session.handle(Event::ManualEntrySubmitted {
            latitude: "abc".to_string(),
            longitude: "12.3".to_string(),
        });

        assert_eq!(session.surface().alerts, vec![INVALID_INPUT_ALERT.to_string()]);
        assert_eq!(session.inflight(), 0);
        assert!(session.controller().locations().is_empty());
    }

    #[tokio::test]
    async fn valid_entry_resets_inputs() {
        let mut session = session_with(&unreachable_url(), 18);

        session.handle(Event::ManualEntrySubmitted {
            latitude: "17.25".to_string(),
            longitude: "78.75".to_string(),
        });
        session.flush().await;

        assert_eq!(session.surface().resets, 1);
        assert_eq!(session.controller().locations().len(), 1);
    }

    #[tokio::test]
    async fn pan_on_either_view_is_mirrored() {
        let mut session = session_with(&unreachable_url(), 18);

        session.pan(ViewSide::Primary, LatLng::new(51.5, -0.12), Some(10));
        let primary = session.controller().view(ViewSide::Primary).view_state();
        assert_eq!(primary, session.controller().view(ViewSide::Secondary).view_state());
        assert_eq!(primary.zoom, 10);

        session.pan(ViewSide::Secondary, LatLng::new(48.85, 2.35), None);
        let secondary = session.controller().view(ViewSide::Secondary).view_state();
        assert_eq!(secondary, session.controller().view(ViewSide::Primary).view_state());
        assert_eq!(secondary.zoom, 10);
    }

    #[tokio::test]
    async fn mismatched_max_zoom_converges_without_looping() {
        let mut session = session_with(&unreachable_url(), 17);

        // Street view allows 19, satellite tops out at 17.
        session.pan(ViewSide::Primary, LatLng::new(17.0, 78.0), Some(19));

        let primary = session.controller().view(ViewSide::Primary).view_state();
        let secondary = session.controller().view(ViewSide::Secondary).view_state();
        assert_eq!(primary, secondary);
        assert_eq!(primary.zoom, 17);
    }

    #[tokio::test]
    async fn zoom_slider_applies_to_both_views() {
        let mut session = session_with(&unreachable_url(), 18);
        session.handle(Event::ZoomSliderChanged(6));
        for side in [ViewSide::Primary, ViewSide::Secondary] {
            assert_eq!(session.controller().view(side).view_state().zoom, 6);
        }
    }

    #[tokio::test]
    async fn show_renders_table_and_both_views() {
        let mut session = session_with(&unreachable_url(), 18);
        session.handle(Event::MapClicked(LatLng::new(17.0, 78.0)));
        session.flush().await;

        session.show();

        let views = session.surface().views.last().unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].label, "street");
        assert_eq!(views[1].label, "satellite");
        assert_eq!(views[0].base_layer, BaseLayer::Street);
        assert_eq!(views[1].base_layer, BaseLayer::Satellite);
        assert!(views[0].zoom_control);
        assert!(!views[1].zoom_control);
        assert!(views.iter().all(|v| v.markers == 1));
        assert_eq!(session.surface().tables.last().unwrap().len(), 1);
    }
}
