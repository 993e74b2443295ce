use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use graphidx_common::id::Id;
use graphidx_common::types::{ElementType, LabelId, PropertyId};
use graphidx_common::value::ScalarValue;
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// A vertex or an edge together with its user properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    id: Id,
    element_type: ElementType,
    label: LabelId,
    properties: BTreeMap<PropertyId, ScalarValue>,
}

impl Element {
    #[inline]
    pub fn new(id: impl Into<Id>, element_type: ElementType, label: LabelId) -> Self {
        Self {
            id: id.into(),
            element_type,
            label,
            properties: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn vertex(id: impl Into<Id>, label: LabelId) -> Self {
        Self::new(id, ElementType::Vertex, label)
    }

    #[inline]
    pub fn edge(id: impl Into<Id>, label: LabelId) -> Self {
        Self::new(id, ElementType::Edge, label)
    }

    pub fn with_property(mut self, key: PropertyId, value: impl Into<ScalarValue>) -> Self {
        self.properties.insert(key, value.into());
        self
    }

    /// Sets a property, returning the previous value if any.
    pub fn set_property(
        &mut self,
        key: PropertyId,
        value: impl Into<ScalarValue>,
    ) -> Option<ScalarValue> {
        self.properties.insert(key, value.into())
    }

    pub fn remove_property(&mut self, key: PropertyId) -> Option<ScalarValue> {
        self.properties.remove(&key)
    }

    #[inline]
    pub fn id(&self) -> &Id {
        &self.id
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    #[inline]
    pub fn label(&self) -> LabelId {
        self.label
    }

    #[inline]
    pub fn property(&self, key: PropertyId) -> Option<&ScalarValue> {
        self.properties.get(&key)
    }

    #[inline]
    pub fn properties(&self) -> &BTreeMap<PropertyId, ScalarValue> {
        &self.properties
    }
}

pub type ElementProviderRef = Arc<dyn ElementProvider>;

/// Looks up the latest committed state of an element.
pub trait ElementProvider: Debug + Send + Sync {
    /// Returns `None` if the element does not exist (any more).
    fn element(&self, element_type: ElementType, id: &Id) -> StorageResult<Option<Element>>;
}
