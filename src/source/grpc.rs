//! gRPC client for the camera stream service.
//!
//! Messages are declared with `prost` derives directly; only the two unary
//! calls the viewer needs are exposed.

use async_trait::async_trait;
use bytes::Bytes;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, instrument};

use super::{CameraData, CameraSource};
use crate::error::SourceError;
use crate::SourceConfig;

const GET_ACTIVE_CAMERA_IDS: &str = "/camerastream.CameraStream/GetActiveCameraIds";
const GET_CAMERA_TEXTURE: &str = "/camerastream.CameraStream/GetCameraTexture";

#[derive(Clone, PartialEq, prost::Message)]
pub struct ActiveCamerasRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ActiveCamerasReply {
    #[prost(string, repeated, tag = "1")]
    pub camera_ids: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CameraRequest {
    #[prost(string, tag = "1")]
    pub camera_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CameraFrame {
    #[prost(string, tag = "1")]
    pub camera_id: String,
    #[prost(string, tag = "2")]
    pub camera_name: String,
    #[prost(string, tag = "3")]
    pub speed: String,
    #[prost(string, tag = "4")]
    pub altitude: String,
    #[prost(bytes = "vec", tag = "5")]
    pub texture: Vec<u8>,
}

impl From<CameraFrame> for CameraData {
    fn from(frame: CameraFrame) -> Self {
        let texture = (!frame.texture.is_empty()).then(|| Bytes::from(frame.texture));
        Self {
            texture,
            speed: frame.speed,
            altitude: frame.altitude,
        }
    }
}

/// Lazily connected client; connection problems surface per call.
#[derive(Clone)]
pub struct GrpcSource {
    inner: Grpc<Channel>,
    endpoint: String,
}

impl GrpcSource {
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(config: &SourceConfig) -> Result<Self, SourceError> {
        let endpoint = config.endpoint();
        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| SourceError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(config.request_timeout())
            .timeout(config.request_timeout())
            .connect_lazy();

        info!("Camera source endpoint: {}", endpoint);
        Ok(Self {
            inner: Grpc::new(channel),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn unary<Req, Resp>(&self, request: Req, path: &'static str) -> Result<Resp, SourceError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut client = self.inner.clone();
        client
            .ready()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = client
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                codec,
            )
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl CameraSource for GrpcSource {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn camera_ids(&self) -> Result<Vec<String>, SourceError> {
        let reply: ActiveCamerasReply = self
            .unary(ActiveCamerasRequest {}, GET_ACTIVE_CAMERA_IDS)
            .await?;
        debug!("Source reports {} camera(s)", reply.camera_ids.len());
        Ok(reply.camera_ids)
    }

    async fn camera_data(&self, camera_id: &str) -> Result<Option<CameraData>, SourceError> {
        let request = CameraRequest {
            camera_id: camera_id.to_owned(),
        };
        match self.unary::<_, CameraFrame>(request, GET_CAMERA_TEXTURE).await {
            Ok(frame) => Ok(Some(frame.into())),
            Err(SourceError::Rpc(status)) if status.code() == tonic::Code::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
