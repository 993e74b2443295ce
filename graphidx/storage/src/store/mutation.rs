use super::entry::BackendEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Adds the element ids of the entry.
    Append,
    /// Removes the element ids of the entry.
    Eliminate,
    /// Removes every entry of the index label, regardless of field values.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationItem {
    pub action: Action,
    pub entry: BackendEntry,
}

/// Uncommitted index changes of one transaction, applied to the store in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendMutation {
    items: Vec<MutationItem>,
}

impl BackendMutation {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, action: Action, entry: BackendEntry) {
        self.items.push(MutationItem { action, entry });
    }

    /// Whether the mutation holds `action` for the key of `entry`.
    pub fn contains(&self, entry: &BackendEntry, action: Action) -> bool {
        self.items
            .iter()
            .any(|item| item.action == action && item.entry.same_key(entry))
    }

    #[inline]
    pub fn items(&self) -> &[MutationItem] {
        &self.items
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
