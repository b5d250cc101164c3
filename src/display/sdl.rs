//! SDL2 Window Presenter
//! Draws every visible pane of the [`Viewer`] into one SDL2 window.
//! Uses the sdl2 crate for window management and rendering.

use color_eyre::{eyre::eyre, Result};
use sdl2::event::{Event, WindowEvent};
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

use tracing::{info, warn};

use super::ui::{Presenter, SurfaceEvent};
use super::viewer::{Pane, Scaling, Viewer};
use crate::error::ViewerError;
use crate::DisplayConfig;

/// SDL2 Window Presenter
/// Owns the window, canvas and event pump; must stay on the thread that
/// created it.
pub struct Sdl2Presenter {
    _context: sdl2::Sdl,
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    event_pump: EventPump,
    title: String,
    last_status: Option<&'static str>,
}

impl Sdl2Presenter {
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        let context = sdl2::init().map_err(|e| eyre!(e))?;
        let video_subsystem = context.video().map_err(|e| eyre!(e))?;

        let window = video_subsystem
            .window(&config.title, config.width, config.height)
            .position_centered()
            .resizable()
            .build()?;

        let canvas = window.into_canvas().present_vsync().build()?;
        let texture_creator = canvas.texture_creator();
        let event_pump = context.event_pump().map_err(|e| eyre!(e))?;

        info!("SDL2 window {}x{} created", config.width, config.height);
        Ok(Self {
            _context: context,
            canvas,
            texture_creator,
            event_pump,
            title: config.title.clone(),
            last_status: None,
        })
    }

    fn draw_pane(&mut self, viewer: &Viewer, pane: &Pane) -> Result<()> {
        let geometry = pane.geometry();
        let rect = geometry.rect;
        if rect.width <= 0 || rect.height <= 0 {
            return Ok(());
        }
        let pane_rect = Rect::new(rect.left, rect.top, rect.width as u32, rect.height as u32);

        let image = viewer.image_for(pane);
        let mut texture = self
            .texture_creator
            .create_texture_static(PixelFormatEnum::RGBA32, image.width, image.height)
            .map_err(|e| eyre!(e))?;
        texture
            .update(None, &image.rgba, image.stride())
            .map_err(|e| eyre!(e))?;

        let target = match pane.scaling() {
            Scaling::Fill => centered(
                pane_rect,
                geometry.image_width.max(1) as u32,
                geometry.image_height.max(1) as u32,
            ),
            Scaling::Fit => {
                let scale = f64::min(
                    f64::from(pane_rect.width()) / f64::from(image.width.max(1)),
                    f64::from(pane_rect.height()) / f64::from(image.height.max(1)),
                );
                centered(
                    pane_rect,
                    (f64::from(image.width) * scale).max(1.0) as u32,
                    (f64::from(image.height) * scale).max(1.0) as u32,
                )
            }
        };

        self.canvas
            .set_clip_rect(if pane.clips() { Some(pane_rect) } else { None });
        self.canvas
            .copy(&texture, None, Some(target))
            .map_err(|e| eyre!(e))?;
        self.canvas.set_clip_rect(None);
        Ok(())
    }

    fn sync_title(&mut self, status: Option<&'static str>) {
        if status == self.last_status {
            return;
        }
        self.last_status = status;
        let title = match status {
            Some(text) => format!("{} - {}", self.title, text),
            None => self.title.clone(),
        };
        if let Err(e) = self.canvas.window_mut().set_title(&title) {
            warn!("Failed to set window title: {}", e);
        }
    }
}

fn centered(outer: Rect, width: u32, height: u32) -> Rect {
    let x = outer.x() + (outer.width() as i32 - width as i32) / 2;
    let y = outer.y() + (outer.height() as i32 - height as i32) / 2;
    Rect::new(x, y, width, height)
}

impl Presenter for Sdl2Presenter {
    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        self.event_pump
            .poll_iter()
            .filter_map(|event| match event {
                Event::Quit { .. } => Some(SurfaceEvent::CloseRequested),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(width, height),
                    ..
                } => Some(SurfaceEvent::Resized {
                    width: width.max(0) as u32,
                    height: height.max(0) as u32,
                }),
                _ => None,
            })
            .collect()
    }

    fn present(&mut self, viewer: &Viewer) -> Result<(), ViewerError> {
        self.sync_title(viewer.status_text());

        self.canvas.set_draw_color(Color::RGB(0, 0, 0));
        self.canvas.clear();

        let mut failed = Vec::new();
        for pane in viewer.panes().iter().filter(|p| p.is_visible()) {
            if let Err(e) = self.draw_pane(viewer, pane) {
                warn!("Failed to draw slot {}: {}", pane.index(), e);
                failed.push(pane.index());
            }
        }

        self.canvas.present();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ViewerError::Present(format!("slots {:?} not drawn", failed)))
        }
    }
}
