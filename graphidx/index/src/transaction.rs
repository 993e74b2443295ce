use std::sync::Arc;

use graphidx_storage::query::ConditionQuery;
use graphidx_storage::store::{Action, BackendMutation, EntryIteratorRef};
use tracing::debug;

use crate::engine::IndexEngine;
use crate::error::IndexResult;
use crate::record::IndexRecord;

/// A unit of index changes.
///
/// Maintenance operations buffer their changes in the mutation of the transaction; nothing
/// reaches the store before [`IndexTransaction::commit`]. A transaction is used by one thread
/// at a time.
#[derive(Debug)]
pub struct IndexTransaction {
    engine: Arc<IndexEngine>,
    mutation: BackendMutation,
}

impl IndexTransaction {
    pub(crate) fn new(engine: Arc<IndexEngine>) -> Self {
        Self {
            engine,
            mutation: BackendMutation::new(),
        }
    }

    #[inline]
    pub fn engine(&self) -> &Arc<IndexEngine> {
        &self.engine
    }

    #[inline]
    pub fn mutation(&self) -> &BackendMutation {
        &self.mutation
    }

    #[inline]
    pub fn has_updates(&self) -> bool {
        !self.mutation.is_empty()
    }

    /// Buffers adding the element ids of `record` to its entry.
    pub fn do_append(&mut self, record: &IndexRecord) {
        self.buffer(Action::Append, record);
    }

    /// Buffers removing the element ids of `record` from its entry.
    pub fn do_eliminate(&mut self, record: &IndexRecord) {
        self.buffer(Action::Eliminate, record);
    }

    /// Buffers removing every entry of the index label of `record`.
    pub fn do_remove(&mut self, record: &IndexRecord) {
        self.mutation.add(Action::Remove, record.to_entry());
    }

    fn buffer(&mut self, action: Action, record: &IndexRecord) {
        if record.element_ids().is_empty() {
            return;
        }
        self.mutation.add(action, record.to_entry());
    }

    /// Scans the store directly, ignoring buffered changes.
    pub fn query(&self, query: &ConditionQuery) -> IndexResult<EntryIteratorRef> {
        Ok(self.engine.store().query(query)?)
    }

    /// Applies the buffered changes to the store. On failure the changes stay buffered until
    /// [`IndexTransaction::rollback`].
    pub fn commit(&mut self) -> IndexResult<()> {
        if self.mutation.is_empty() {
            return Ok(());
        }
        self.engine.store().mutate(&self.mutation)?;
        debug!(items = self.mutation.len(), "committed index mutation");
        self.mutation.clear();
        Ok(())
    }

    /// Discards the buffered changes.
    pub fn rollback(&mut self) {
        if !self.mutation.is_empty() {
            debug!(items = self.mutation.len(), "rolled back index mutation");
        }
        self.mutation.clear();
    }
}
