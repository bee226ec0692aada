use stride_tracks::errors::TrackError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Track(#[from] TrackError),

    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("Failed to write GPX document: {0}")]
    Write(#[from] std::fmt::Error),
}
