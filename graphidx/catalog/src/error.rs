use std::error::Error;

use graphidx_common::types::{IndexLabelId, LabelId, PropertyId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("index label {0} not found")]
    IndexLabelNotFound(IndexLabelId),

    #[error("vertex label {0} not found")]
    VertexLabelNotFound(LabelId),

    #[error("edge label {0} not found")]
    EdgeLabelNotFound(LabelId),

    #[error("property key {0} not found")]
    PropertyKeyNotFound(PropertyId),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("invalid index label '{name}': {reason}")]
    InvalidIndexLabel { name: String, reason: String },

    #[error(transparent)]
    External(#[from] Box<dyn Error + Send + Sync + 'static>),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
