use serde::{Deserialize, Serialize};

/// Physical backend table holding the entries of one kind of index.
///
/// Every index label writes to exactly one table; entries inside a table are keyed by
/// `(index label id, encoded field value)`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum IndexTable {
    SecondaryIndex,
    VertexLabelIndex,
    EdgeLabelIndex,
    RangeIntIndex,
    RangeLongIndex,
    RangeFloatIndex,
    RangeDoubleIndex,
    SearchIndex,
    ShardIndex,
    UniqueIndex,
}

impl IndexTable {
    /// Tables whose field values are sortable numbers queried with range bounds.
    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            IndexTable::RangeIntIndex
                | IndexTable::RangeLongIndex
                | IndexTable::RangeFloatIndex
                | IndexTable::RangeDoubleIndex
        )
    }

    #[inline]
    pub fn is_label_index(&self) -> bool {
        matches!(self, IndexTable::VertexLabelIndex | IndexTable::EdgeLabelIndex)
    }
}
