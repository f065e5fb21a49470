use crate::controller::TableRow;
use crate::view::{BaseLayer, ViewState};
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSummary {
    pub label: String,
    pub base_layer: BaseLayer,
    pub zoom_control: bool,
    pub state: ViewState,
    pub markers: usize,
}

/// Where the page-level output goes: the location table, alerts and the entry form.
pub trait Surface {
    fn render_table(&mut self, rows: &[TableRow]);
    fn alert(&mut self, message: &str);
    fn reset_inputs(&mut self);
    fn render_views(&mut self, views: &[ViewSummary]);
}

pub struct TerminalSurface<W: Write> {
    out: W,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, lines: &[String]) {
        let res = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{line}"))
            .and_then(|()| self.out.flush());
        if let Err(err) = res {
            tracing::warn!(error=%err, "failed to write to terminal");
        }
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn render_table(&mut self, rows: &[TableRow]) {
        let mut lines = vec![format!("{:>5}  {:>12}  {:>12}", "index", "latitude", "longitude")];
        lines.extend(
            rows.iter()
                .map(|row| format!("{:>5}  {:>12}  {:>12}", row.index, row.latitude, row.longitude)),
        );
        if rows.is_empty() {
            lines.push("(no locations)".to_string());
        }
        self.write_lines(&lines);
    }

    fn alert(&mut self, message: &str) {
        self.write_lines(&[format!("! {message}")]);
    }

    fn reset_inputs(&mut self) {}

    fn render_views(&mut self, views: &[ViewSummary]) {
        let lines: Vec<String> = views
            .iter()
            .flat_map(|view| {
                [
                    format!(
                        "{:<10} center=({:.5}, {:.5}) zoom={} markers={} zoom-control={}",
                        view.label,
                        view.state.center.lat,
                        view.state.center.lng,
                        view.state.zoom,
                        view.markers,
                        if view.zoom_control { "on" } else { "off" }
                    ),
                    format!(
                        "{:<10} tiles {} ({})",
                        "",
                        view.base_layer.tile_url_template(),
                        view.base_layer.attribution()
                    ),
                ]
            })
            .collect();
        self.write_lines(&lines);
    }
}
