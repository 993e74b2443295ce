use std::collections::BTreeSet;

use graphidx_common::types::{ElementType, IndexLabelId, LabelId, PropertyId};
use serde::{Deserialize, Serialize};

/// A vertex label or an edge label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaLabel {
    id: LabelId,
    name: String,
    element_type: ElementType,
    properties: BTreeSet<PropertyId>,
    nullable_keys: BTreeSet<PropertyId>,
    index_labels: Vec<IndexLabelId>,
    enable_label_index: bool,
}

impl SchemaLabel {
    #[inline]
    pub fn new(id: LabelId, name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            id,
            name: name.into(),
            element_type,
            properties: BTreeSet::new(),
            nullable_keys: BTreeSet::new(),
            index_labels: Vec::new(),
            enable_label_index: true,
        }
    }

    #[inline]
    pub fn vertex(id: LabelId, name: impl Into<String>) -> Self {
        Self::new(id, name, ElementType::Vertex)
    }

    #[inline]
    pub fn edge(id: LabelId, name: impl Into<String>) -> Self {
        Self::new(id, name, ElementType::Edge)
    }

    pub fn with_properties(mut self, properties: impl IntoIterator<Item = PropertyId>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Declares properties that may be absent. Nullable keys are implicitly properties of the
    /// label.
    pub fn with_nullable_keys(mut self, keys: impl IntoIterator<Item = PropertyId>) -> Self {
        for key in keys {
            self.properties.insert(key);
            self.nullable_keys.insert(key);
        }
        self
    }

    pub fn with_label_index(mut self, enable: bool) -> Self {
        self.enable_label_index = enable;
        self
    }

    #[inline]
    pub fn id(&self) -> LabelId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    #[inline]
    pub fn properties(&self) -> &BTreeSet<PropertyId> {
        &self.properties
    }

    #[inline]
    pub fn nullable_keys(&self) -> &BTreeSet<PropertyId> {
        &self.nullable_keys
    }

    #[inline]
    pub fn is_nullable(&self, key: PropertyId) -> bool {
        self.nullable_keys.contains(&key)
    }

    /// Index labels built over this label, in creation order.
    #[inline]
    pub fn index_labels(&self) -> &[IndexLabelId] {
        &self.index_labels
    }

    #[inline]
    pub fn enable_label_index(&self) -> bool {
        self.enable_label_index
    }

    pub(crate) fn add_index_label(&mut self, id: IndexLabelId) {
        if !self.index_labels.contains(&id) {
            self.index_labels.push(id);
        }
    }

    pub(crate) fn remove_index_label(&mut self, id: IndexLabelId) {
        self.index_labels.retain(|il| *il != id);
    }
}
