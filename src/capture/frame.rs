use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

/// Decoded RGBA8 image, shared between the decode task and the render thread.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub rgba: Bytes,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, rgba: Bytes) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }

    /// Width over height; 1.0 for degenerate images.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Neutral checkerboard shown while a slot has no live image.
    pub fn placeholder(size: u32) -> Self {
        let size = size.max(8);
        let cell = size / 8;
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let shade = if ((x / cell) + (y / cell)) % 2 == 0 { 0x30 } else { 0x48 };
                rgba.extend_from_slice(&[shade, shade, shade, 0xff]);
            }
        }
        Self::new(size, size, Bytes::from(rgba))
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// One update for one slot. Immutable once built; consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMessage {
    slot: usize,
    image: Option<Arc<DecodedImage>>,
    speed: String,
    altitude: String,
    created: Instant,
}

impl FrameMessage {
    pub fn new(
        slot: usize,
        image: Option<Arc<DecodedImage>>,
        speed: String,
        altitude: String,
    ) -> Self {
        Self {
            slot,
            image,
            speed,
            altitude,
            created: Instant::now(),
        }
    }

    /// No image and no telemetry: the slot shows its placeholder.
    pub fn empty(slot: usize) -> Self {
        Self::new(slot, None, String::new(), String::new())
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn image(&self) -> Option<&Arc<DecodedImage>> {
        self.image.as_ref()
    }

    pub fn speed(&self) -> &str {
        &self.speed
    }

    pub fn altitude(&self) -> &str {
        &self.altitude
    }

    /// Time since the fetch worker built this message.
    pub fn age(&self) -> std::time::Duration {
        self.created.elapsed()
    }
}
