use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use super::frame::DecodedImage;
use crate::error::DecodeError;

/// Decode a JPEG or PNG payload into RGBA8.
pub fn decode_frame(data: &[u8]) -> Result<DecodedImage, DecodeError> {
    let start = Instant::now();
    let rgba = image::load_from_memory(data)?.into_rgba8();
    let (width, height) = rgba.dimensions();

    let elapsed = start.elapsed();
    metrics::histogram!("decode_time_us").record(elapsed.as_micros() as f64);
    debug!("Decoded {}x{} frame in {:?}", width, height, elapsed);

    Ok(DecodedImage::new(width, height, Bytes::from(rgba.into_raw())))
}

/// Decode on the blocking pool so no async or UI thread does image work.
pub async fn decode_off_thread(payload: Bytes) -> Result<Arc<DecodedImage>, DecodeError> {
    let image = tokio::task::spawn_blocking(move || decode_frame(&payload)).await??;
    Ok(Arc::new(image))
}
