use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("STORAGE: {0}")]
    Storage(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for DeskError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for DeskError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
