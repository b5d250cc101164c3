use thiserror::Error;

/// Failures talking to the remote camera source. Always transient.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("camera source unavailable: {0}")]
    Unavailable(String),

    #[error("camera source returned an error: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("invalid camera source endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode image payload: {0}")]
    Image(#[from] image::ImageError),

    #[error("decode task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Returned to producers once the frame queue has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame queue closed")]
pub struct QueueClosed;

/// Returned when the render context has stopped accepting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("render context closed")]
pub struct RenderContextClosed;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("slot index {0} is out of range")]
    SlotOutOfRange(usize),

    #[error("presenter failure: {0}")]
    Present(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] ::config::ConfigError),

    #[error("invalid setting: {0}")]
    Invalid(String),
}
