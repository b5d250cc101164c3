//! Drains the frame queue and forwards each message to the render context.

use std::time::Duration;

use tracing::{info, warn};

use super::ui::{UiCommand, UiDispatcher};
use crate::pipeline::FrameReceiver;
use crate::shutdown::Shutdown;

/// How long to keep draining after shutdown while waiting for producers to
/// close the queue.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub struct FrameConsumer {
    queue: FrameReceiver,
    ui: UiDispatcher,
    shutdown: Shutdown,
}

impl FrameConsumer {
    pub fn new(queue: FrameReceiver, ui: UiDispatcher, shutdown: Shutdown) -> Self {
        Self {
            queue,
            ui,
            shutdown,
        }
    }

    /// Forward messages in arrival order until the queue is closed and
    /// drained. Returns the number of messages forwarded.
    pub async fn run(mut self) -> u64 {
        info!("Frame consumer started");
        let mut forwarded = 0;
        let mut draining = false;

        loop {
            let next = if draining {
                match tokio::time::timeout(CLOSE_GRACE, self.queue.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!("Frame queue still open {:?} after shutdown", CLOSE_GRACE);
                        None
                    }
                }
            } else {
                tokio::select! {
                    next = self.queue.recv() => next,
                    _ = self.shutdown.triggered() => {
                        draining = true;
                        continue;
                    }
                }
            };

            let Some(message) = next else {
                break;
            };

            metrics::histogram!("frame_latency_ms").record(message.age().as_secs_f64() * 1000.0);
            if self.ui.dispatch(UiCommand::Frame(message)).await.is_err() {
                info!("Render context closed, stopping frame consumer");
                break;
            }
            forwarded += 1;
        }

        info!("Frame consumer stopped after {} message(s)", forwarded);
        forwarded
    }
}
