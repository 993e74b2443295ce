pub mod entry;
pub mod mutation;

use std::fmt::Debug;
use std::sync::Arc;

pub use entry::BackendEntry;
pub use mutation::{Action, BackendMutation, MutationItem};

use crate::error::StorageResult;
use crate::query::ConditionQuery;

pub type StoreRef = Arc<dyn BackendStore>;
pub type EntryIteratorRef = Box<dyn EntryIterator>;

/// Capabilities of a backend store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreFeatures {
    /// The store answers "elements with label X" natively, without a label index.
    pub supports_query_by_label: bool,
    /// Entry iterators of the store expose page metadata.
    pub supports_paging: bool,
}

/// Continuation state of a paged scan.
pub trait PageMetadata {
    /// Token of the page following the entries yielded so far, `None` if the scan is exhausted.
    fn next_page(&self) -> Option<String>;
}

pub trait EntryIterator: Iterator<Item = StorageResult<BackendEntry>> + Send {
    /// Page metadata of this iterator, if the store supports it.
    fn page_metadata(&self) -> Option<&dyn PageMetadata> {
        None
    }
}

/// The key/value backend holding index tables.
pub trait BackendStore: Debug + Send + Sync {
    fn features(&self) -> StoreFeatures;

    /// Scans the entries of an index query.
    fn query(&self, query: &ConditionQuery) -> StorageResult<EntryIteratorRef>;

    /// Applies a mutation atomically with respect to other mutations.
    fn mutate(&self, mutation: &BackendMutation) -> StorageResult<()>;
}
