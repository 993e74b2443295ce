use graphidx_catalog::error::CatalogError;
use graphidx_storage::StorageError;
use thiserror::Error;

use crate::codec::CodecError;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// No index label covers the conditions of a query.
    #[error("No index: {0}")]
    NoIndexPath(String),
    #[error("Unsupported query shape: {0}")]
    UnsupportedQueryShape(String),
    #[error("Unique constraint {index_label} conflict is found for {element}")]
    UniqueConstraintViolation { index_label: String, element: String },
    #[error("Malformed index value: {0}")]
    MalformedIndexValue(String),
    /// Internal state is inconsistent. Never expected to happen.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Job scheduler error: {0}")]
    Scheduler(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl From<CodecError> for IndexError {
    #[inline]
    fn from(e: CodecError) -> Self {
        IndexError::MalformedIndexValue(e.to_string())
    }
}
