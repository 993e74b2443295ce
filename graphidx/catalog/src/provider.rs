use std::fmt::Debug;
use std::sync::Arc;

use graphidx_common::types::{ElementType, IndexLabelId, LabelId, PropertyId};

use crate::error::CatalogResult;
use crate::index_label::IndexLabel;
use crate::property::PropertyKey;
use crate::schema_label::SchemaLabel;

pub type SchemaRef = Arc<dyn SchemaProvider>;
pub type IndexLabelRef = Arc<IndexLabel>;
pub type SchemaLabelRef = Arc<SchemaLabel>;
pub type PropertyKeyRef = Arc<PropertyKey>;

/// Read-only access to the schema of a graph.
///
/// The index engine never creates or alters schema objects, it only looks them up by id.
pub trait SchemaProvider: Debug + Send + Sync {
    /// Retrieves an index label by its ID, including the reserved label indexes.
    fn get_index_label(&self, id: IndexLabelId) -> CatalogResult<Option<IndexLabelRef>>;

    /// Retrieves a vertex label by its ID.
    fn get_vertex_label(&self, id: LabelId) -> CatalogResult<Option<SchemaLabelRef>>;

    /// Retrieves an edge label by its ID.
    fn get_edge_label(&self, id: LabelId) -> CatalogResult<Option<SchemaLabelRef>>;

    /// Returns all vertex labels.
    fn get_vertex_labels(&self) -> CatalogResult<Vec<SchemaLabelRef>>;

    /// Returns all edge labels.
    fn get_edge_labels(&self) -> CatalogResult<Vec<SchemaLabelRef>>;

    /// Retrieves a property key by its ID.
    fn get_property_key(&self, id: PropertyId) -> CatalogResult<Option<PropertyKeyRef>>;

    #[inline]
    fn get_schema_label(
        &self,
        element_type: ElementType,
        id: LabelId,
    ) -> CatalogResult<Option<SchemaLabelRef>> {
        match element_type {
            ElementType::Vertex => self.get_vertex_label(id),
            ElementType::Edge => self.get_edge_label(id),
        }
    }

    #[inline]
    fn get_schema_labels(&self, element_type: ElementType) -> CatalogResult<Vec<SchemaLabelRef>> {
        match element_type {
            ElementType::Vertex => self.get_vertex_labels(),
            ElementType::Edge => self.get_edge_labels(),
        }
    }
}
