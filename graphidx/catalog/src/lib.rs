pub mod error;
pub mod index_label;
pub mod memory;
pub mod property;
pub mod provider;
pub mod schema_label;
