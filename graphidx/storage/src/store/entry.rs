use graphidx_common::id::Id;
use graphidx_common::table::IndexTable;
use graphidx_common::types::IndexLabelId;
use serde::{Deserialize, Serialize};

/// A physical index entry: the ids of the elements carrying `field_values` for one index label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendEntry {
    table: IndexTable,
    index_label: IndexLabelId,
    field_values: String,
    element_ids: Vec<Id>,
}

impl BackendEntry {
    #[inline]
    pub fn new(
        table: IndexTable,
        index_label: IndexLabelId,
        field_values: impl Into<String>,
        element_ids: Vec<Id>,
    ) -> Self {
        Self {
            table,
            index_label,
            field_values: field_values.into(),
            element_ids,
        }
    }

    #[inline]
    pub fn table(&self) -> IndexTable {
        self.table
    }

    #[inline]
    pub fn index_label(&self) -> IndexLabelId {
        self.index_label
    }

    #[inline]
    pub fn field_values(&self) -> &str {
        &self.field_values
    }

    #[inline]
    pub fn element_ids(&self) -> &[Id] {
        &self.element_ids
    }

    #[inline]
    pub fn into_element_ids(self) -> Vec<Id> {
        self.element_ids
    }

    /// Whether both entries address the same `(table, index label, field values)` key.
    #[inline]
    pub fn same_key(&self, other: &BackendEntry) -> bool {
        self.table == other.table
            && self.index_label == other.index_label
            && self.field_values == other.field_values
    }
}
