//! Remote camera source: roster discovery and per-camera frame fetch.

pub mod grpc;
pub mod synthetic;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

pub use grpc::GrpcSource;
pub use synthetic::SyntheticSource;

/// One fetch result for a camera: encoded image plus raw telemetry strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraData {
    pub texture: Option<Bytes>,
    pub speed: String,
    pub altitude: String,
}

impl CameraData {
    /// Encoded payload, treating an empty buffer as no payload.
    pub fn payload(&self) -> Option<&Bytes> {
        self.texture.as_ref().filter(|bytes| !bytes.is_empty())
    }
}

#[async_trait]
pub trait CameraSource: Send + Sync + 'static {
    /// Identifiers of the cameras currently streaming, in source order.
    async fn camera_ids(&self) -> Result<Vec<String>, SourceError>;

    /// Latest data for one camera; `None` when the source has nothing for it.
    async fn camera_data(&self, camera_id: &str) -> Result<Option<CameraData>, SourceError>;
}

#[async_trait]
impl<S: CameraSource + ?Sized> CameraSource for std::sync::Arc<S> {
    async fn camera_ids(&self) -> Result<Vec<String>, SourceError> {
        (**self).camera_ids().await
    }

    async fn camera_data(&self, camera_id: &str) -> Result<Option<CameraData>, SourceError> {
        (**self).camera_data(camera_id).await
    }
}
