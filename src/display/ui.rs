//! The render context: a single thread owning the [`Viewer`], fed by
//! commands from the background loops.

use std::time::Duration;

use flume::{Receiver, Sender, TryRecvError};
use tracing::{error, info};

use super::viewer::Viewer;
use crate::capture::{FeedStatus, FrameMessage};
use crate::error::{RenderContextClosed, ViewerError};

/// A surface mutation requested from off the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    Frame(FrameMessage),
    Status(FeedStatus),
    Roster { active: usize },
}

/// Cross-thread handle to the render context.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<UiCommand>,
}

impl UiDispatcher {
    /// Waits while the render context is behind; fails once it is gone.
    pub async fn dispatch(&self, command: UiCommand) -> Result<(), RenderContextClosed> {
        self.tx
            .send_async(command)
            .await
            .map_err(|_| RenderContextClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_disconnected()
    }
}

pub struct UiReceiver {
    rx: Receiver<UiCommand>,
}

impl UiReceiver {
    /// Everything pending right now, in order.
    pub fn drain(&self) -> Vec<UiCommand> {
        self.rx.try_iter().collect()
    }

    pub fn try_recv(&self) -> Result<UiCommand, TryRecvError> {
        self.rx.try_recv()
    }
}

pub fn channel(capacity: usize) -> (UiDispatcher, UiReceiver) {
    let (tx, rx) = flume::bounded(capacity.max(1));
    (UiDispatcher { tx }, UiReceiver { rx })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// Window backend driven by [`RenderLoop`].
pub trait Presenter {
    fn poll_events(&mut self) -> Vec<SurfaceEvent>;

    fn present(&mut self, viewer: &Viewer) -> Result<(), ViewerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    CloseRequested,
    /// Every dispatcher was dropped.
    Disconnected,
}

pub struct RenderLoop<P> {
    viewer: Viewer,
    commands: UiReceiver,
    presenter: P,
    frame_interval: Duration,
}

impl<P: Presenter> RenderLoop<P> {
    pub fn new(viewer: Viewer, commands: UiReceiver, presenter: P, frame_interval: Duration) -> Self {
        Self {
            viewer,
            commands,
            presenter,
            frame_interval,
        }
    }

    /// Run on the calling thread until the window closes or every
    /// producer has gone. Returns the final surface state.
    pub fn run(mut self) -> (Viewer, LoopExit) {
        info!("Render loop started");
        let exit = loop {
            if let Some(exit) = self.tick() {
                break exit;
            }
            std::thread::sleep(self.frame_interval);
        };
        info!("Render loop stopped: {:?}", exit);
        (self.viewer, exit)
    }

    /// Handle window events, apply all pending commands, present once.
    pub fn tick(&mut self) -> Option<LoopExit> {
        for event in self.presenter.poll_events() {
            match event {
                SurfaceEvent::Resized { width, height } => self.viewer.resize(width, height),
                SurfaceEvent::CloseRequested => {
                    info!("Window close requested");
                    return Some(LoopExit::CloseRequested);
                }
            }
        }

        let mut disconnected = false;
        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    if let Err(e) = self.viewer.apply(command) {
                        error!("Surface update failed: {}", e);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if let Err(e) = self.presenter.present(&self.viewer) {
            error!("Present failed: {}", e);
        }

        disconnected.then_some(LoopExit::Disconnected)
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }
}
