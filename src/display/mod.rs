pub mod consumer;
pub mod headless;
pub mod layout;
#[cfg(feature = "sdl-display")]
pub mod sdl;
pub mod ui;
pub mod viewer;

pub use consumer::FrameConsumer;
pub use headless::HeadlessPresenter;
pub use layout::{LayoutSpec, PaneGeometry, PaneRect};
#[cfg(feature = "sdl-display")]
pub use sdl::Sdl2Presenter;
pub use ui::{LoopExit, Presenter, RenderLoop, SurfaceEvent, UiCommand, UiDispatcher, UiReceiver};
pub use viewer::{FrameEffect, LabelBlock, Pane, PaneImage, Scaling, Viewer};
