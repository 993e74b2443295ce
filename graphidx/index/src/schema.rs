//! Schema lookups that treat a missing schema object as an error.

use graphidx_catalog::error::CatalogError;
use graphidx_catalog::provider::{IndexLabelRef, PropertyKeyRef, SchemaLabelRef, SchemaProvider};
use graphidx_common::types::{ElementType, IndexLabelId, LabelId, PropertyId};
use graphidx_common::value::ScalarValue;

use crate::error::{IndexError, IndexResult};

pub(crate) fn index_label(
    schema: &dyn SchemaProvider,
    id: IndexLabelId,
) -> IndexResult<IndexLabelRef> {
    schema
        .get_index_label(id)?
        .ok_or(IndexError::Catalog(CatalogError::IndexLabelNotFound(id)))
}

pub(crate) fn schema_label(
    schema: &dyn SchemaProvider,
    element_type: ElementType,
    id: LabelId,
) -> IndexResult<SchemaLabelRef> {
    schema
        .get_schema_label(element_type, id)?
        .ok_or_else(|| {
            IndexError::Catalog(match element_type {
                ElementType::Vertex => CatalogError::VertexLabelNotFound(id),
                ElementType::Edge => CatalogError::EdgeLabelNotFound(id),
            })
        })
}

pub(crate) fn property_key(
    schema: &dyn SchemaProvider,
    id: PropertyId,
) -> IndexResult<PropertyKeyRef> {
    schema
        .get_property_key(id)?
        .ok_or(IndexError::Catalog(CatalogError::PropertyKeyNotFound(id)))
}

/// Index labels of a schema label, in declaration order.
pub(crate) fn index_labels_of(
    schema: &dyn SchemaProvider,
    label: &SchemaLabelRef,
) -> IndexResult<Vec<IndexLabelRef>> {
    label
        .index_labels()
        .iter()
        .map(|id| index_label(schema, *id))
        .collect()
}

/// Converts `value` to the data type of property key `key`.
pub(crate) fn convert_value(
    schema: &dyn SchemaProvider,
    key: PropertyId,
    value: &ScalarValue,
) -> IndexResult<ScalarValue> {
    let pk = property_key(schema, key)?;
    pk.convert(value).ok_or_else(|| {
        IndexError::MalformedIndexValue(format!(
            "value {value} of property '{}' is not {}",
            pk.name(),
            pk.data_type()
        ))
    })
}
