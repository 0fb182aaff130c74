use thiserror::Error;

use crate::domain::id::TrackId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("file {0} not found")]
    ArtifactNotFound(String),

    #[error("invalid file name {0:?}")]
    InvalidArtifactName(String),

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
