use crate::domain::text::{ChunkError, DecodeError};
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ReaderServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("no file loaded")]
    NoSession,
    #[error("section {0} not found")]
    SectionNotFound(usize),
    #[error("section {0} is already being generated")]
    Busy(usize),
    #[error("section {0} has no audio yet")]
    NotReady(usize),
    #[error("session was reset while the request was in flight")]
    Stale,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DecodeError> for ReaderServiceError {
    fn from(err: DecodeError) -> Self {
        ReaderServiceError::Invalid(err.to_string())
    }
}

impl From<ChunkError> for ReaderServiceError {
    fn from(err: ChunkError) -> Self {
        ReaderServiceError::Invalid(err.to_string())
    }
}

impl From<AppError> for ReaderServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => ReaderServiceError::Invalid(msg),
            AppError::Storage(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                ReaderServiceError::Other(anyhow::Error::from(err))
            }
            _ => ReaderServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<ReaderServiceError> for AppError {
    fn from(err: ReaderServiceError) -> Self {
        match err {
            ReaderServiceError::Invalid(msg) => AppError::BadRequest(msg),
            ReaderServiceError::NoSession => AppError::NotFound("No file loaded".to_string()),
            ReaderServiceError::SectionNotFound(index) => {
                AppError::NotFound(format!("Section {} not found", index))
            }
            ReaderServiceError::Busy(index) => {
                AppError::Conflict(format!("Section {} is already being generated", index))
            }
            ReaderServiceError::NotReady(index) => {
                AppError::Conflict(format!("Section {} has no audio yet", index))
            }
            ReaderServiceError::Stale => {
                AppError::Conflict("Session was reset during the request".to_string())
            }
            ReaderServiceError::Dependency(msg) => AppError::ExternalService(msg),
            ReaderServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
