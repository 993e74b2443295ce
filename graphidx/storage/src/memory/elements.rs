use dashmap::DashMap;
use graphidx_common::id::Id;
use graphidx_common::types::ElementType;

use crate::error::StorageResult;
use crate::model::element::{Element, ElementProvider};

/// Latest committed elements, keyed by type and id.
#[derive(Debug, Default)]
pub struct MemoryElements {
    elements: DashMap<(ElementType, Id), Element>,
}

impl MemoryElements {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an element, returning the previous state.
    pub fn put(&self, element: Element) -> Option<Element> {
        self.elements
            .insert((element.element_type(), element.id().clone()), element)
    }

    pub fn remove(&self, element_type: ElementType, id: &Id) -> Option<Element> {
        self.elements
            .remove(&(element_type, id.clone()))
            .map(|(_, element)| element)
    }

    pub fn get(&self, element_type: ElementType, id: &Id) -> Option<Element> {
        self.elements
            .get(&(element_type, id.clone()))
            .map(|e| e.value().clone())
    }
}

impl ElementProvider for MemoryElements {
    fn element(&self, element_type: ElementType, id: &Id) -> StorageResult<Option<Element>> {
        Ok(self.get(element_type, id))
    }
}
