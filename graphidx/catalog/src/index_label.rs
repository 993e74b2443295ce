use graphidx_common::table::IndexTable;
use graphidx_common::types::{
    EDGE_LABEL_INDEX_ID, ElementType, IndexLabelId, LabelId, PropertyId, VERTEX_LABEL_INDEX_ID,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{CatalogError, CatalogResult};

pub type IndexFields = SmallVec<[PropertyId; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    Secondary,
    RangeInt,
    RangeLong,
    RangeFloat,
    RangeDouble,
    Search,
    Shard,
    Unique,
}

impl IndexType {
    #[inline]
    pub fn is_secondary(&self) -> bool {
        matches!(self, IndexType::Secondary)
    }

    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            IndexType::RangeInt | IndexType::RangeLong | IndexType::RangeFloat | IndexType::RangeDouble
        )
    }

    /// Index types able to answer range conditions.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.is_range() || self.is_shard()
    }

    #[inline]
    pub fn is_search(&self) -> bool {
        matches!(self, IndexType::Search)
    }

    #[inline]
    pub fn is_shard(&self) -> bool {
        matches!(self, IndexType::Shard)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        matches!(self, IndexType::Unique)
    }

    /// Physical table the entries of this index type are stored in.
    pub fn table(&self) -> IndexTable {
        match self {
            IndexType::Secondary => IndexTable::SecondaryIndex,
            IndexType::RangeInt => IndexTable::RangeIntIndex,
            IndexType::RangeLong => IndexTable::RangeLongIndex,
            IndexType::RangeFloat => IndexTable::RangeFloatIndex,
            IndexType::RangeDouble => IndexTable::RangeDoubleIndex,
            IndexType::Search => IndexTable::SearchIndex,
            IndexType::Shard => IndexTable::ShardIndex,
            IndexType::Unique => IndexTable::UniqueIndex,
        }
    }
}

/// What an index label is built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexBase {
    VertexLabel(LabelId),
    EdgeLabel(LabelId),
    /// The label index of all vertices, keyed by vertex label id.
    VertexLabelIndex,
    /// The label index of all edges, keyed by edge label id.
    EdgeLabelIndex,
}

impl IndexBase {
    #[inline]
    pub fn element_type(&self) -> ElementType {
        match self {
            IndexBase::VertexLabel(_) | IndexBase::VertexLabelIndex => ElementType::Vertex,
            IndexBase::EdgeLabel(_) | IndexBase::EdgeLabelIndex => ElementType::Edge,
        }
    }

    #[inline]
    pub fn base_label(&self) -> Option<LabelId> {
        match self {
            IndexBase::VertexLabel(label) | IndexBase::EdgeLabel(label) => Some(*label),
            _ => None,
        }
    }
}

/// Schema object describing one index over an ordered list of property keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexLabel {
    id: IndexLabelId,
    name: String,
    base: IndexBase,
    index_type: IndexType,
    fields: IndexFields,
}

impl IndexLabel {
    /// Creates an index label over `fields` of a vertex or edge label.
    ///
    /// Range and search indexes must be built over exactly one field, every other index type
    /// over at least one distinct field.
    pub fn new(
        id: IndexLabelId,
        name: impl Into<String>,
        base: IndexBase,
        index_type: IndexType,
        fields: impl IntoIterator<Item = PropertyId>,
    ) -> CatalogResult<Self> {
        let name = name.into();
        let fields: IndexFields = fields.into_iter().collect();
        let invalid = |reason: &str| CatalogError::InvalidIndexLabel {
            name: name.clone(),
            reason: reason.to_string(),
        };
        if base.base_label().is_none() {
            return Err(invalid("must be based on a vertex or edge label"));
        }
        if fields.is_empty() {
            return Err(invalid("no index fields"));
        }
        if (index_type.is_range() || index_type.is_search()) && fields.len() != 1 {
            return Err(invalid(&format!(
                "{index_type} index must have exactly one field"
            )));
        }
        if fields
            .iter()
            .enumerate()
            .any(|(i, f)| fields[..i].contains(f))
        {
            return Err(invalid("duplicate index fields"));
        }
        Ok(Self {
            id,
            name,
            base,
            index_type,
            fields,
        })
    }

    /// The label index of vertices or edges, keyed by the label id of each element.
    pub fn label_index(element_type: ElementType) -> Self {
        let (id, name, base) = match element_type {
            ElementType::Vertex => (
                VERTEX_LABEL_INDEX_ID,
                "~vertex_label_index",
                IndexBase::VertexLabelIndex,
            ),
            ElementType::Edge => (
                EDGE_LABEL_INDEX_ID,
                "~edge_label_index",
                IndexBase::EdgeLabelIndex,
            ),
        };
        Self {
            id,
            name: name.to_string(),
            base,
            index_type: IndexType::Secondary,
            fields: IndexFields::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> IndexLabelId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn base(&self) -> IndexBase {
        self.base
    }

    #[inline]
    pub fn base_label(&self) -> Option<LabelId> {
        self.base.base_label()
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.base.element_type()
    }

    #[inline]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Ordered property keys of this index. The order defines the composite prefix.
    #[inline]
    pub fn fields(&self) -> &[PropertyId] {
        &self.fields
    }

    /// The sole field of a range or search index.
    #[inline]
    pub fn index_field(&self) -> Option<PropertyId> {
        match self.fields.as_slice() {
            [field] => Some(*field),
            _ => None,
        }
    }

    #[inline]
    pub fn is_label_index(&self) -> bool {
        self.base.base_label().is_none()
    }

    pub fn table(&self) -> IndexTable {
        match self.base {
            IndexBase::VertexLabelIndex => IndexTable::VertexLabelIndex,
            IndexBase::EdgeLabelIndex => IndexTable::EdgeLabelIndex,
            _ => self.index_type.table(),
        }
    }
}
