//! Presenter without a window: logs what would be drawn.

use tracing::{debug, info};

use super::ui::{Presenter, SurfaceEvent};
use super::viewer::{Pane, PaneImage, Viewer};
use crate::error::ViewerError;
use crate::MAX_SLOTS;

/// Logs layout changes, status transitions and per-pane telemetry; never
/// requests close.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    last_generation: u64,
    last_status: Option<&'static str>,
    last_telemetry: [Option<(String, String)>; MAX_SLOTS],
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_telemetry(&mut self, pane: &Pane) {
        let current = pane
            .speed()
            .zip(pane.altitude())
            .map(|(speed, altitude)| (speed.value(), altitude.value()));
        let last = &mut self.last_telemetry[pane.index()];
        if current == last.as_ref().map(|(s, a)| (s.as_str(), a.as_str())) {
            return;
        }

        match current {
            Some((speed, altitude)) => {
                debug!(
                    "  slot {}: speed {} KM/H, altitude {} KM",
                    pane.index(),
                    speed,
                    altitude
                );
                *last = Some((speed.to_owned(), altitude.to_owned()));
            }
            None => {
                debug!("  slot {}: no telemetry", pane.index());
                *last = None;
            }
        }
    }
}

impl Presenter for HeadlessPresenter {
    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        Vec::new()
    }

    fn present(&mut self, viewer: &Viewer) -> Result<(), ViewerError> {
        let status = viewer.status_text();
        if status != self.last_status {
            info!("Status: {}", status.unwrap_or("streaming"));
            self.last_status = status;
        }

        if viewer.layout_generation() != self.last_generation {
            self.last_generation = viewer.layout_generation();
            let (width, height) = viewer.size();
            info!(
                "Layout {}x{}: {} feed(s), ratio {:.3}",
                width,
                height,
                viewer.active(),
                viewer.aspect_ratio()
            );
            for pane in viewer.panes().iter().filter(|p| p.is_visible()) {
                let rect = pane.geometry().rect;
                let live = matches!(pane.image(), PaneImage::Live(_));
                debug!(
                    "  slot {}: {}x{} at ({}, {}) live={}",
                    pane.index(),
                    rect.width,
                    rect.height,
                    rect.left,
                    rect.top,
                    live
                );
            }
        }

        for pane in viewer.panes().iter() {
            self.log_telemetry(pane);
        }
        Ok(())
    }
}
