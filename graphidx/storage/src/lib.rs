pub mod error;
pub mod memory;
pub mod model;
pub mod query;
pub mod store;

pub use error::{StorageError, StorageResult};
