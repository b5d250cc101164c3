//! Per-slot poll, dedupe and decode loop feeding the frame queue.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use super::decoder;
use super::frame::FrameMessage;
use super::roster::RosterHandle;
use super::telemetry::{parse_altitude, parse_speed};
use crate::pipeline::FrameSender;
use crate::shutdown::Shutdown;
use crate::source::CameraSource;
use crate::MAX_SLOTS;

/// Producer-side state of one display slot.
#[derive(Debug, Clone, Default)]
pub struct CameraSlot {
    index: usize,
    camera_id: Option<String>,
    last_payload: Option<Bytes>,
}

impl CameraSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn camera_id(&self) -> Option<&str> {
        self.camera_id.as_deref()
    }

    /// Bind the slot to `camera_id`. A different camera starts with no
    /// remembered payload.
    fn assign(&mut self, camera_id: Option<&str>) {
        if self.camera_id.as_deref() != camera_id {
            self.camera_id = camera_id.map(str::to_owned);
            self.last_payload = None;
        }
    }

    fn is_duplicate(&self, payload: &Bytes) -> bool {
        self.last_payload.as_ref() == Some(payload)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub sweeps: u64,
    pub emitted: u64,
    pub duplicates: u64,
    pub decodes: u64,
    pub fetch_failures: u64,
    pub decode_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed,
    /// Shutdown was observed between slots.
    Interrupted,
    QueueClosed,
}

pub struct FetchWorker<S> {
    source: S,
    roster: RosterHandle,
    slots: [CameraSlot; MAX_SLOTS],
    queue: FrameSender,
    interval: Duration,
    shutdown: Shutdown,
    stats: FetchStats,
}

impl<S: CameraSource> FetchWorker<S> {
    pub fn new(
        source: S,
        roster: RosterHandle,
        queue: FrameSender,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            source,
            roster,
            slots: std::array::from_fn(CameraSlot::new),
            queue,
            interval,
            shutdown,
            stats: FetchStats::default(),
        }
    }

    /// Sweep until shutdown or queue close, then close the queue.
    pub async fn run(mut self) -> FetchStats {
        info!("Fetch worker started, sweeping every {:?}", self.interval);
        loop {
            let interval = self.interval;
            if !self.shutdown.sleep(interval).await {
                break;
            }
            match self.sweep().await {
                SweepOutcome::Completed => {}
                SweepOutcome::Interrupted => break,
                SweepOutcome::QueueClosed => {
                    info!("Frame queue closed, stopping fetch worker");
                    break;
                }
            }
        }

        self.queue.close();
        info!("Fetch worker stopped: {:?}", self.stats);
        self.stats
    }

    /// One pass over every assigned slot. Failures are isolated per slot.
    #[instrument(skip(self), level = "trace")]
    pub async fn sweep(&mut self) -> SweepOutcome {
        let roster = self.roster.load();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.assign(roster.get(index));
        }
        self.stats.sweeps += 1;

        for index in 0..roster.len().min(MAX_SLOTS) {
            if self.shutdown.is_triggered() {
                return SweepOutcome::Interrupted;
            }
            let Some(camera_id) = self.slots[index].camera_id.clone() else {
                continue;
            };
            let Some(message) = self.fetch_slot(index, &camera_id).await else {
                continue;
            };

            if self.queue.send(message).is_err() {
                return SweepOutcome::QueueClosed;
            }
            self.stats.emitted += 1;
            metrics::counter!("frames_emitted").increment(1);
        }
        SweepOutcome::Completed
    }

    async fn fetch_slot(&mut self, index: usize, camera_id: &str) -> Option<FrameMessage> {
        let data = match self.source.camera_data(camera_id).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Fetch failed for camera {} (slot {}): {}", camera_id, index, e);
                self.stats.fetch_failures += 1;
                metrics::counter!("fetch_failures").increment(1);
                return None;
            }
        };

        let Some((data, payload)) =
            data.and_then(|d| d.payload().cloned().map(|payload| (d, payload)))
        else {
            self.slots[index].last_payload = None;
            return Some(FrameMessage::empty(index));
        };

        if self.slots[index].is_duplicate(&payload) {
            self.stats.duplicates += 1;
            metrics::counter!("duplicate_payloads").increment(1);
            return None;
        }
        self.slots[index].last_payload = Some(payload.clone());

        self.stats.decodes += 1;
        let image = match decoder::decode_off_thread(payload).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Decode failed for camera {} (slot {}): {}", camera_id, index, e);
                self.stats.decode_failures += 1;
                metrics::counter!("decode_failures").increment(1);
                None
            }
        };

        debug!("Slot {} frame ready (image: {})", index, image.is_some());
        Some(FrameMessage::new(
            index,
            image,
            parse_speed(&data.speed),
            parse_altitude(&data.altitude),
        ))
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn slot(&self, index: usize) -> Option<&CameraSlot> {
        self.slots.get(index)
    }
}
