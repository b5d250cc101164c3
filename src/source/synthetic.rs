//! Offline camera source that renders moving test patterns.

use std::collections::HashMap;
use std::io::Cursor;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};
use parking_lot::Mutex;

use super::{CameraData, CameraSource};
use crate::error::SourceError;

const FRAME_PERIOD: Duration = Duration::from_millis(100);

/// Serves `cameras` feeds of `width`x`height` JPEG frames. A new frame is
/// produced every 100 ms; between ticks the same bytes are returned.
pub struct SyntheticSource {
    ids: Vec<String>,
    width: u32,
    height: u32,
    started: Instant,
    cache: Mutex<HashMap<String, (u64, Bytes)>>,
}

impl SyntheticSource {
    pub fn new(cameras: usize, width: u32, height: u32) -> Self {
        Self {
            ids: (1..=cameras).map(|i| format!("cam-{i}")).collect(),
            width: width.max(1),
            height: height.max(1),
            started: Instant::now(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn tick(&self) -> u64 {
        (self.started.elapsed().as_millis() / FRAME_PERIOD.as_millis()) as u64
    }

    fn render(&self, seed: u32, tick: u64) -> Result<Bytes, SourceError> {
        let shift = (tick % 256) as u32;
        let img = RgbImage::from_fn(self.width, self.height, |x, y| {
            let r = ((x * 255 / self.width) + shift) % 256;
            let g = ((y * 255 / self.height) + seed * 40) % 256;
            let b = (seed * 70 + shift * 2) % 256;
            image::Rgb([r as u8, g as u8, b as u8])
        });

        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .map_err(|e| SourceError::Unavailable(format!("synthetic encode: {e}")))?;
        Ok(Bytes::from(buf))
    }
}

#[async_trait]
impl CameraSource for SyntheticSource {
    async fn camera_ids(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.ids.clone())
    }

    async fn camera_data(&self, camera_id: &str) -> Result<Option<CameraData>, SourceError> {
        let Some(seed) = self.ids.iter().position(|id| id == camera_id) else {
            return Ok(None);
        };
        let tick = self.tick();

        let cached = self
            .cache
            .lock()
            .get(camera_id)
            .filter(|(at, _)| *at == tick)
            .map(|(_, bytes)| bytes.clone());
        let texture = match cached {
            Some(bytes) => bytes,
            None => {
                let bytes = self.render(seed as u32, tick)?;
                self.cache
                    .lock()
                    .insert(camera_id.to_owned(), (tick, bytes.clone()));
                bytes
            }
        };

        let speed = 100 + (tick + seed as u64 * 17) % 900;
        let altitude = ((tick % 1000) as f64) / 10.0 + seed as f64;
        Ok(Some(CameraData {
            texture: Some(texture),
            speed: format!("SPEED: {speed} KM/H"),
            altitude: format!("ALTITUDE: {altitude:.1} KM"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_configured_cameras() {
        let source = SyntheticSource::new(3, 32, 18);
        assert_eq!(source.camera_ids().await.unwrap(), vec!["cam-1", "cam-2", "cam-3"]);
        assert!(source.camera_data("cam-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn frames_decode_to_configured_size() {
        let source = SyntheticSource::new(1, 32, 18);
        let first = source.camera_data("cam-1").await.unwrap().unwrap();
        let payload = first.payload().unwrap().clone();

        let img = image::load_from_memory(&payload).unwrap();
        assert_eq!((img.width(), img.height()), (32, 18));
        assert!(first.speed.starts_with("SPEED: "));
        assert!(first.altitude.ends_with(" KM"));
    }
}
