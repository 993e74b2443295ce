use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
    #[error("Invalid page token: {0}")]
    InvalidPage(String),
}
