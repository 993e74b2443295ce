use std::sync::Arc;

use dashmap::DashMap;
use graphidx_common::types::IndexLabelId;
use parking_lot::{RwLock, RwLockReadGuard};

/// Schema-level operations guarded per index label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LockGroup {
    IndexLabelDelete,
    IndexLabelRebuild,
}

/// Per index label read/write locks.
///
/// Index scans hold the read side, so that an index label is not deleted or rebuilt in the
/// middle of a scan. Element writes are not serialized by these locks.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: DashMap<(LockGroup, IndexLabelId), Arc<RwLock<()>>>,
}

impl LockManager {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_of(&self, group: LockGroup, index_label: IndexLabelId) -> Arc<RwLock<()>> {
        self.locks
            .entry((group, index_label))
            .or_default()
            .value()
            .clone()
    }

    /// Runs `f` holding the read locks of `groups` on `index_label`. The locks are released
    /// when `f` returns or unwinds.
    pub fn with_read_locks<T>(
        &self,
        index_label: IndexLabelId,
        groups: &[LockGroup],
        f: impl FnOnce() -> T,
    ) -> T {
        let locks: Vec<_> = groups
            .iter()
            .map(|group| self.lock_of(*group, index_label))
            .collect();
        let _guards: Vec<RwLockReadGuard<'_, ()>> = locks.iter().map(|l| l.read()).collect();
        f()
    }

    /// Runs `f` holding the write lock of `group` on `index_label`.
    pub fn with_write_lock<T>(
        &self,
        group: LockGroup,
        index_label: IndexLabelId,
        f: impl FnOnce() -> T,
    ) -> T {
        let lock = self.lock_of(group, index_label);
        let _guard = lock.write();
        f()
    }
}
