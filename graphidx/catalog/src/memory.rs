use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use graphidx_common::types::{ElementType, IndexLabelId, LabelId, PropertyId};

use crate::error::{CatalogError, CatalogResult};
use crate::index_label::{IndexBase, IndexLabel};
use crate::property::PropertyKey;
use crate::provider::{IndexLabelRef, PropertyKeyRef, SchemaLabelRef, SchemaProvider};
use crate::schema_label::SchemaLabel;

/// An in-memory schema, built up front and then shared read-only.
#[derive(Debug)]
pub struct MemorySchema {
    property_keys: BTreeMap<PropertyId, PropertyKeyRef>,
    vertex_labels: BTreeMap<LabelId, SchemaLabelRef>,
    edge_labels: BTreeMap<LabelId, SchemaLabelRef>,
    index_labels: BTreeMap<IndexLabelId, IndexLabelRef>,
}

impl Default for MemorySchema {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySchema {
    pub fn new() -> Self {
        let index_labels = [ElementType::Vertex, ElementType::Edge]
            .into_iter()
            .map(IndexLabel::label_index)
            .map(|il| (il.id(), Arc::new(il)))
            .collect();
        Self {
            property_keys: BTreeMap::new(),
            vertex_labels: BTreeMap::new(),
            edge_labels: BTreeMap::new(),
            index_labels,
        }
    }

    pub fn add_property_key(&mut self, key: PropertyKey) -> CatalogResult<PropertyKeyRef> {
        match self.property_keys.entry(key.id()) {
            Entry::Occupied(_) => Err(CatalogError::AlreadyExists(format!(
                "property key '{}'",
                key.name()
            ))),
            Entry::Vacant(e) => Ok(e.insert(Arc::new(key)).clone()),
        }
    }

    /// Adds a vertex or edge label. All of its properties must already exist.
    pub fn add_schema_label(&mut self, label: SchemaLabel) -> CatalogResult<SchemaLabelRef> {
        if let Some(missing) = label
            .properties()
            .iter()
            .find(|p| !self.property_keys.contains_key(p))
        {
            return Err(CatalogError::PropertyKeyNotFound(*missing));
        }
        let labels = match label.element_type() {
            ElementType::Vertex => &mut self.vertex_labels,
            ElementType::Edge => &mut self.edge_labels,
        };
        match labels.entry(label.id()) {
            Entry::Occupied(_) => Err(CatalogError::AlreadyExists(format!(
                "{} label '{}'",
                label.element_type(),
                label.name()
            ))),
            Entry::Vacant(e) => Ok(e.insert(Arc::new(label)).clone()),
        }
    }

    /// Adds an index label and registers it on its base label.
    pub fn add_index_label(&mut self, index_label: IndexLabel) -> CatalogResult<IndexLabelRef> {
        if self.index_labels.contains_key(&index_label.id()) {
            return Err(CatalogError::AlreadyExists(format!(
                "index label '{}'",
                index_label.name()
            )));
        }
        let base = self.base_label_mut(index_label.base())?;
        if let Some(field) = index_label
            .fields()
            .iter()
            .find(|f| !base.properties().contains(f))
        {
            return Err(CatalogError::InvalidIndexLabel {
                name: index_label.name().to_string(),
                reason: format!("field {field} is not a property of '{}'", base.name()),
            });
        }
        Arc::make_mut(base).add_index_label(index_label.id());
        let index_label = Arc::new(index_label);
        self.index_labels
            .insert(index_label.id(), index_label.clone());
        Ok(index_label)
    }

    pub fn remove_index_label(&mut self, id: IndexLabelId) -> CatalogResult<IndexLabelRef> {
        let index_label = self
            .index_labels
            .get(&id)
            .cloned()
            .filter(|il| !il.is_label_index())
            .ok_or(CatalogError::IndexLabelNotFound(id))?;
        Arc::make_mut(self.base_label_mut(index_label.base())?).remove_index_label(id);
        self.index_labels.remove(&id);
        Ok(index_label)
    }

    fn base_label_mut(&mut self, base: IndexBase) -> CatalogResult<&mut SchemaLabelRef> {
        match base {
            IndexBase::VertexLabel(id) => self
                .vertex_labels
                .get_mut(&id)
                .ok_or(CatalogError::VertexLabelNotFound(id)),
            IndexBase::EdgeLabel(id) => self
                .edge_labels
                .get_mut(&id)
                .ok_or(CatalogError::EdgeLabelNotFound(id)),
            IndexBase::VertexLabelIndex | IndexBase::EdgeLabelIndex => {
                Err(CatalogError::InvalidIndexLabel {
                    name: "label index".to_string(),
                    reason: "label indexes are reserved".to_string(),
                })
            }
        }
    }
}

impl SchemaProvider for MemorySchema {
    #[inline]
    fn get_index_label(&self, id: IndexLabelId) -> CatalogResult<Option<IndexLabelRef>> {
        Ok(self.index_labels.get(&id).cloned())
    }

    #[inline]
    fn get_vertex_label(&self, id: LabelId) -> CatalogResult<Option<SchemaLabelRef>> {
        Ok(self.vertex_labels.get(&id).cloned())
    }

    #[inline]
    fn get_edge_label(&self, id: LabelId) -> CatalogResult<Option<SchemaLabelRef>> {
        Ok(self.edge_labels.get(&id).cloned())
    }

    #[inline]
    fn get_vertex_labels(&self) -> CatalogResult<Vec<SchemaLabelRef>> {
        Ok(self.vertex_labels.values().cloned().collect())
    }

    #[inline]
    fn get_edge_labels(&self) -> CatalogResult<Vec<SchemaLabelRef>> {
        Ok(self.edge_labels.values().cloned().collect())
    }

    #[inline]
    fn get_property_key(&self, id: PropertyId) -> CatalogResult<Option<PropertyKeyRef>> {
        Ok(self.property_keys.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use graphidx_common::data_type::DataType;
    use graphidx_common::types::VERTEX_LABEL_INDEX_ID;

    use super::*;
    use crate::index_label::IndexType;

    const NAME: PropertyId = 1;
    const AGE: PropertyId = 2;

    fn id(n: u32) -> LabelId {
        LabelId::new(n).unwrap()
    }

    fn schema() -> MemorySchema {
        let mut schema = MemorySchema::new();
        schema
            .add_property_key(PropertyKey::new(NAME, "name", DataType::String))
            .unwrap();
        schema
            .add_property_key(PropertyKey::new(AGE, "age", DataType::Int32))
            .unwrap();
        schema
            .add_schema_label(SchemaLabel::vertex(id(1), "person").with_properties([NAME, AGE]))
            .unwrap();
        schema
    }

    #[test]
    fn test_add_index_label_registers_on_base() {
        let mut schema = schema();
        let il = IndexLabel::new(
            id(10),
            "personByName",
            IndexBase::VertexLabel(id(1)),
            IndexType::Secondary,
            [NAME],
        )
        .unwrap();
        schema.add_index_label(il).unwrap();
        let person = schema.get_vertex_label(id(1)).unwrap().unwrap();
        assert_eq!(person.index_labels(), &[id(10)]);

        schema.remove_index_label(id(10)).unwrap();
        let person = schema.get_vertex_label(id(1)).unwrap().unwrap();
        assert!(person.index_labels().is_empty());
        assert!(schema.get_index_label(id(10)).unwrap().is_none());
    }

    #[test]
    fn test_add_index_label_rejects_foreign_field() {
        let mut schema = schema();
        let il = IndexLabel::new(
            id(11),
            "personByCity",
            IndexBase::VertexLabel(id(1)),
            IndexType::Secondary,
            [99],
        )
        .unwrap();
        assert!(matches!(
            schema.add_index_label(il),
            Err(CatalogError::InvalidIndexLabel { .. })
        ));
        let il = IndexLabel::new(
            id(12),
            "softwareByName",
            IndexBase::VertexLabel(id(2)),
            IndexType::Secondary,
            [NAME],
        )
        .unwrap();
        assert!(matches!(
            schema.add_index_label(il),
            Err(CatalogError::VertexLabelNotFound(_))
        ));
    }

    #[test]
    fn test_label_indexes_are_reserved() {
        let mut schema = schema();
        assert!(schema.get_index_label(VERTEX_LABEL_INDEX_ID).unwrap().is_some());
        assert!(schema.remove_index_label(VERTEX_LABEL_INDEX_ID).is_err());
        assert!(schema.add_schema_label(SchemaLabel::vertex(id(1), "dup")).is_err());
    }
}
