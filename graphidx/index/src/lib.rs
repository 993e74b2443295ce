//! Index maintenance and index query planning for a property graph.
//!
//! The write path ([`IndexTransaction::update_vertex_index`] and friends) derives index entries
//! from element properties. The read path ([`IndexTransaction::query_index`]) matches index
//! labels against the conditions of a query, builds backend sub-queries for them and merges the
//! resulting element ids. Stale entries found by a read can be repaired asynchronously with
//! [`IndexEngine::schedule_left_index_repair`].

pub mod analyzer;
pub mod builder;
pub mod codec;
pub mod combination;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod holder;
pub mod id_set;
pub mod job;
pub mod lock;
pub mod maintainer;
pub mod matcher;
pub mod record;
pub mod repair;
mod schema;
pub mod transaction;

pub use config::IndexConfig;
pub use engine::IndexEngine;
pub use error::{IndexError, IndexResult};
pub use transaction::IndexTransaction;
