use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Internal identifier associated with a vertex label or an edge label.
///
/// # Examples
/// [`NonZeroU32`] is used to enable some memory layout optimizations.
/// For example, `Option<LabelId>` is guaranteed to have the same size as `LabelId`:
/// ```
/// # use std::mem::size_of;
/// # use graphidx_common::types::LabelId;
/// assert_eq!(size_of::<Option<LabelId>>(), size_of::<LabelId>());
/// ```
pub type LabelId = NonZeroU32;

/// Internal identifier associated with an index label (graph-wide unique).
pub type IndexLabelId = NonZeroU32;

/// Internal identifier associated with a property key (graph-wide unique).
pub type PropertyId = u32;

/// Index label id reserved for the label index of vertices.
pub const VERTEX_LABEL_INDEX_ID: IndexLabelId = IndexLabelId::new(u32::MAX).unwrap();

/// Index label id reserved for the label index of edges.
pub const EDGE_LABEL_INDEX_ID: IndexLabelId = IndexLabelId::new(u32::MAX - 1).unwrap();

/// The kind of graph element a label or an index describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum ElementType {
    Vertex,
    Edge,
}

impl ElementType {
    #[inline]
    pub fn is_vertex(&self) -> bool {
        matches!(self, ElementType::Vertex)
    }

    #[inline]
    pub fn is_edge(&self) -> bool {
        matches!(self, ElementType::Edge)
    }
}
