use graphidx_catalog::index_label::IndexLabel;
use graphidx_common::id::Id;
use graphidx_common::table::IndexTable;
use graphidx_common::types::IndexLabelId;
use graphidx_storage::store::BackendEntry;

use crate::error::{IndexError, IndexResult};

/// An index entry on the write path: the ids of the elements carrying `field_values` for one
/// index label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    table: IndexTable,
    index_label: IndexLabelId,
    field_values: String,
    element_ids: Vec<Id>,
}

impl IndexRecord {
    pub fn new(index_label: &IndexLabel, field_values: impl Into<String>) -> Self {
        Self {
            table: index_label.table(),
            index_label: index_label.id(),
            field_values: field_values.into(),
            element_ids: Vec::new(),
        }
    }

    pub fn with_element_id(mut self, id: Id) -> Self {
        if !self.element_ids.contains(&id) {
            self.element_ids.push(id);
        }
        self
    }

    /// Decodes a scanned entry of `index_label`.
    pub fn from_entry(index_label: &IndexLabel, entry: BackendEntry) -> IndexResult<Self> {
        if entry.index_label() != index_label.id() || entry.table() != index_label.table() {
            return Err(IndexError::InvariantViolation(format!(
                "entry of index label {} in {} read as '{}'",
                entry.index_label(),
                entry.table(),
                index_label.name()
            )));
        }
        let field_values = entry.field_values().to_string();
        Ok(Self {
            table: entry.table(),
            index_label: entry.index_label(),
            field_values,
            element_ids: entry.into_element_ids(),
        })
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

    /// Keeps `id` as the only element id.
    pub fn reset_element_ids(mut self, id: Id) -> Self {
        self.element_ids.clear();
        self.element_ids.push(id);
        self
    }

    pub fn to_entry(&self) -> BackendEntry {
        BackendEntry::new(
            self.table,
            self.index_label,
            self.field_values.clone(),
            self.element_ids.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use graphidx_catalog::index_label::{IndexBase, IndexType};
    use graphidx_common::types::{ElementType, LabelId};

    use super::*;

    #[test]
    fn test_entry_round_trip() {
        let il = IndexLabel::new(
            IndexLabelId::new(3).unwrap(),
            "personByCity",
            IndexBase::VertexLabel(LabelId::new(1).unwrap()),
            IndexType::Secondary,
            [1],
        )
        .unwrap();
        let record = IndexRecord::new(&il, "Beijing")
            .with_element_id(Id::from(1))
            .with_element_id(Id::from(1));
        assert_eq!(record.element_ids().len(), 1);
        let entry = record.to_entry();
        assert_eq!(entry.table(), IndexTable::SecondaryIndex);
        assert_eq!(IndexRecord::from_entry(&il, entry.clone()).unwrap(), record);

        let label_index = IndexLabel::label_index(ElementType::Vertex);
        assert!(matches!(
            IndexRecord::from_entry(&label_index, entry),
            Err(IndexError::InvariantViolation(_))
        ));
    }
}
