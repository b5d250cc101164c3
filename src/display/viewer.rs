//! Render-surface model. Owned and mutated by the render thread only.

use std::sync::Arc;

use tracing::{debug, trace};

use super::layout::{self, LayoutSpec, PaneGeometry};
use super::ui::UiCommand;
use crate::capture::{DecodedImage, FeedStatus, FrameMessage};
use crate::error::ViewerError;
use crate::MAX_SLOTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// Preserve aspect ratio inside the pane.
    Fit,
    /// Stretch to the computed image size.
    Fill,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaneImage {
    Placeholder,
    Live(Arc<DecodedImage>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelLine {
    pub text: String,
    pub font_size: u32,
}

/// Caption, value and unit stacked vertically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBlock {
    pub lines: [LabelLine; 3],
}

impl LabelBlock {
    fn new(caption: &str, value: &str, unit: &str, pane_height: i32) -> Self {
        let height = pane_height.max(0) as u32;
        let big = (height / 25).max(10);
        let small = (height / 50).max(5);
        let line = |text: &str, font_size| LabelLine {
            text: text.to_owned(),
            font_size,
        };
        Self {
            lines: [line(caption, small), line(value, big), line(unit, small)],
        }
    }

    pub fn value(&self) -> &str {
        &self.lines[1].text
    }
}

#[derive(Debug, Clone)]
pub struct Pane {
    index: usize,
    image: PaneImage,
    clip: bool,
    scaling: Scaling,
    geometry: PaneGeometry,
    speed: Option<LabelBlock>,
    altitude: Option<LabelBlock>,
}

impl Pane {
    fn new(index: usize) -> Self {
        Self {
            index,
            image: PaneImage::Placeholder,
            clip: false,
            scaling: Scaling::Fit,
            geometry: PaneGeometry::default(),
            speed: None,
            altitude: None,
        }
    }

    fn show_placeholder(&mut self) {
        self.image = PaneImage::Placeholder;
        self.clip = false;
        self.scaling = Scaling::Fit;
    }

    fn show_live(&mut self, image: Arc<DecodedImage>) {
        self.image = PaneImage::Live(image);
        self.clip = true;
        self.scaling = Scaling::Fill;
    }

    fn set_telemetry(&mut self, speed: &str, altitude: &str) {
        if speed.is_empty() || altitude.is_empty() {
            self.speed = None;
            self.altitude = None;
            return;
        }
        let height = self.geometry.rect.height;
        self.speed = Some(LabelBlock::new("SPEED", speed, "KM/H", height));
        self.altitude = Some(LabelBlock::new("ALTITUDE", altitude, "KM", height));
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image(&self) -> &PaneImage {
        &self.image
    }

    pub fn clips(&self) -> bool {
        self.clip
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    pub fn geometry(&self) -> &PaneGeometry {
        &self.geometry
    }

    pub fn is_visible(&self) -> bool {
        self.geometry.visible
    }

    pub fn speed(&self) -> Option<&LabelBlock> {
        self.speed.as_ref()
    }

    pub fn altitude(&self) -> Option<&LabelBlock> {
        self.altitude.as_ref()
    }
}

/// What applying a frame did to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEffect {
    Updated,
    /// The feed aspect ratio changed and the layout was recomputed.
    Relayout,
}

pub struct Viewer {
    panes: [Pane; MAX_SLOTS],
    placeholder: Arc<DecodedImage>,
    width: u32,
    height: u32,
    active: usize,
    aspect_ratio: f64,
    status: FeedStatus,
    layout_generation: u64,
}

impl Viewer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut viewer = Self {
            panes: std::array::from_fn(Pane::new),
            placeholder: Arc::new(DecodedImage::placeholder(256)),
            width,
            height,
            active: 0,
            aspect_ratio: 1.0,
            status: FeedStatus::Connecting,
            layout_generation: 0,
        };
        viewer.relayout();
        viewer
    }

    pub fn apply(&mut self, command: UiCommand) -> Result<(), ViewerError> {
        match command {
            UiCommand::Frame(message) => self.apply_frame(&message).map(|_| ()),
            UiCommand::Status(status) => {
                self.set_status(status);
                Ok(())
            }
            UiCommand::Roster { active } => {
                self.set_active(active);
                Ok(())
            }
        }
    }

    pub fn apply_frame(&mut self, message: &FrameMessage) -> Result<FrameEffect, ViewerError> {
        let slot = message.slot();
        let pane = self
            .panes
            .get_mut(slot)
            .ok_or(ViewerError::SlotOutOfRange(slot))?;

        let mut effect = FrameEffect::Updated;
        match message.image() {
            None => pane.show_placeholder(),
            Some(image) => {
                let ratio = image.aspect_ratio();
                pane.show_live(image.clone());
                if ratio != self.aspect_ratio {
                    debug!("Feed aspect ratio {:.3} -> {:.3}", self.aspect_ratio, ratio);
                    self.aspect_ratio = ratio;
                    self.relayout();
                    effect = FrameEffect::Relayout;
                }
            }
        }

        // Relayout may have changed the pane height the labels scale with.
        self.panes[slot].set_telemetry(message.speed(), message.altitude());
        trace!("Applied frame to slot {}", slot);
        Ok(effect)
    }

    /// Waiting-for-feed also resets every pane to the placeholder.
    pub fn set_status(&mut self, status: FeedStatus) {
        if status == FeedStatus::WaitingForFeed {
            for pane in &mut self.panes {
                pane.show_placeholder();
                pane.set_telemetry("", "");
            }
        }
        self.status = status;
    }

    pub fn set_active(&mut self, active: usize) {
        self.active = active;
        self.relayout();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.relayout();
        }
    }

    fn relayout(&mut self) {
        let spec = layout::compute(self.width, self.height, self.active, self.aspect_ratio);
        for (pane, geometry) in self.panes.iter_mut().zip(spec.panes) {
            pane.geometry = geometry;
        }
        self.layout_generation += 1;
    }

    pub fn layout(&self) -> LayoutSpec {
        layout::compute(self.width, self.height, self.active, self.aspect_ratio)
    }

    pub fn pane(&self, slot: usize) -> Option<&Pane> {
        self.panes.get(slot)
    }

    pub fn panes(&self) -> &[Pane; MAX_SLOTS] {
        &self.panes
    }

    pub fn placeholder(&self) -> &Arc<DecodedImage> {
        &self.placeholder
    }

    /// Image currently drawn in `pane`, placeholder included.
    pub fn image_for<'a>(&'a self, pane: &'a Pane) -> &'a Arc<DecodedImage> {
        match &pane.image {
            PaneImage::Live(image) => image,
            PaneImage::Placeholder => &self.placeholder,
        }
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn status_text(&self) -> Option<&'static str> {
        self.status.message()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bumped on every recomputation of the layout.
    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn image(width: u32, height: u32) -> Arc<DecodedImage> {
        let rgba = vec![0u8; (width * height * 4) as usize];
        Arc::new(DecodedImage::new(width, height, Bytes::from(rgba)))
    }

    fn live(slot: usize, img: Arc<DecodedImage>) -> FrameMessage {
        FrameMessage::new(slot, Some(img), "850".into(), "12.5".into())
    }

    #[test]
    fn missing_image_shows_placeholder_unclipped() {
        let mut viewer = Viewer::new(1200, 800);
        viewer.set_active(3);
        viewer.apply_frame(&live(0, image(16, 9))).unwrap();
        viewer.apply_frame(&live(2, image(16, 9))).unwrap();

        viewer.apply_frame(&FrameMessage::empty(2)).unwrap();

        let pane = viewer.pane(2).unwrap();
        assert_eq!(pane.image(), &PaneImage::Placeholder);
        assert!(!pane.clips());
        assert_eq!(pane.scaling(), Scaling::Fit);
        assert!(pane.speed().is_none() && pane.altitude().is_none());

        let other = viewer.pane(0).unwrap();
        assert!(matches!(other.image(), PaneImage::Live(_)));
        assert!(other.clips());
        assert_eq!(other.scaling(), Scaling::Fill);
    }

    #[test]
    fn new_aspect_ratio_triggers_relayout_once() {
        let mut viewer = Viewer::new(1200, 800);
        viewer.set_active(2);
        let generation = viewer.layout_generation();

        assert_eq!(
            viewer.apply_frame(&live(0, image(16, 9))).unwrap(),
            FrameEffect::Relayout
        );
        assert_eq!(viewer.layout_generation(), generation + 1);
        assert_eq!(
            viewer.apply_frame(&live(1, image(32, 18))).unwrap(),
            FrameEffect::Updated
        );
        assert_eq!(viewer.layout_generation(), generation + 1);
        assert!((viewer.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn placeholder_keeps_recorded_ratio() {
        let mut viewer = Viewer::new(1200, 800);
        viewer.apply_frame(&live(0, image(4, 3))).unwrap();
        viewer.apply_frame(&FrameMessage::empty(0)).unwrap();
        assert!((viewer.aspect_ratio() - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn telemetry_blocks_scale_with_pane_height() {
        let mut viewer = Viewer::new(1000, 1000);
        viewer.set_active(1);
        viewer.apply_frame(&live(0, image(10, 10))).unwrap();

        let pane = viewer.pane(0).unwrap();
        let speed = pane.speed().unwrap();
        assert_eq!(
            speed.lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(),
            vec!["SPEED", "850", "KM/H"]
        );
        assert_eq!(speed.lines[1].font_size, 40);
        assert_eq!(speed.lines[0].font_size, 20);
        assert_eq!(pane.altitude().unwrap().value(), "12.5");
        assert_eq!(pane.altitude().unwrap().lines[2].text, "KM");
    }

    #[test]
    fn small_panes_use_minimum_font_sizes() {
        let mut viewer = Viewer::new(200, 100);
        viewer.set_active(6);
        viewer.apply_frame(&live(5, image(1, 1))).unwrap();
        let block = viewer.pane(5).unwrap().speed().unwrap().clone();
        assert_eq!(block.lines[1].font_size, 10);
        assert_eq!(block.lines[0].font_size, 5);
    }

    #[test]
    fn partial_telemetry_clears_blocks() {
        let mut viewer = Viewer::new(800, 800);
        viewer.apply_frame(&live(0, image(1, 1))).unwrap();
        viewer
            .apply_frame(&FrameMessage::new(0, Some(image(1, 1)), "10".into(), String::new()))
            .unwrap();
        assert!(viewer.pane(0).unwrap().speed().is_none());
    }

    #[test]
    fn waiting_for_feed_resets_all_panes() {
        let mut viewer = Viewer::new(800, 800);
        viewer.set_active(2);
        viewer.apply_frame(&live(0, image(1, 1))).unwrap();
        viewer.apply_frame(&live(1, image(1, 1))).unwrap();

        viewer.set_status(FeedStatus::WaitingForFeed);
        assert_eq!(viewer.status_text(), Some("Waiting for camera feed..."));
        assert!(viewer
            .panes()
            .iter()
            .all(|p| p.image() == &PaneImage::Placeholder && !p.clips()));
    }

    #[test]
    fn out_of_range_slot_is_an_error() {
        let mut viewer = Viewer::new(800, 800);
        assert!(matches!(
            viewer.apply_frame(&FrameMessage::empty(MAX_SLOTS)),
            Err(ViewerError::SlotOutOfRange(6))
        ));
    }

    #[test]
    fn roster_command_relayouts_visible_panes() {
        let mut viewer = Viewer::new(1200, 800);
        viewer.apply(UiCommand::Roster { active: 4 }).unwrap();
        let visible: Vec<usize> = viewer
            .panes()
            .iter()
            .filter(|p| p.is_visible())
            .map(Pane::index)
            .collect();
        assert_eq!(visible, vec![0, 1, 2, 3]);
        assert_eq!(viewer.layout().visible_count(), 4);
    }

    #[test]
    fn resize_recomputes_geometry() {
        let mut viewer = Viewer::new(1200, 800);
        viewer.set_active(1);
        let before = *viewer.pane(0).unwrap().geometry();
        viewer.resize(600, 400);
        let after = *viewer.pane(0).unwrap().geometry();
        assert_ne!(before, after);
        assert_eq!(after.rect.height, 400);
    }
}
