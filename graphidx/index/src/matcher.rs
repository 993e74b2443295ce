//! Choosing the index labels able to answer the property conditions of a query.

use std::collections::BTreeSet;

use graphidx_catalog::provider::{IndexLabelRef, SchemaLabelRef, SchemaProvider};
use graphidx_common::types::PropertyId;
use graphidx_storage::query::ConditionQuery;

use crate::error::{IndexError, IndexResult};
use crate::schema;

/// The index labels of one schema label that together answer a query.
#[derive(Debug, Clone)]
pub struct MatchedIndex {
    schema_label: SchemaLabelRef,
    index_labels: Vec<IndexLabelRef>,
}

impl MatchedIndex {
    #[inline]
    pub fn new(schema_label: SchemaLabelRef, index_labels: Vec<IndexLabelRef>) -> Self {
        Self {
            schema_label,
            index_labels,
        }
    }

    #[inline]
    pub fn schema_label(&self) -> &SchemaLabelRef {
        &self.schema_label
    }

    #[inline]
    pub fn index_labels(&self) -> &[IndexLabelRef] {
        &self.index_labels
    }

    /// Whether more than one index label is needed, so that their results are intersected.
    #[inline]
    pub fn is_joint(&self) -> bool {
        self.index_labels.len() > 1
    }

    pub fn contains_search_index(&self) -> bool {
        self.index_labels
            .iter()
            .any(|il| il.index_type().is_search())
    }
}

/// Collects, per candidate schema label, the index labels answering `query`.
///
/// The candidates are the label of the query if it has one, every label of the result type
/// otherwise. Labels with no matching index are left out.
pub fn collect_matched_indexes(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
) -> IndexResult<Vec<MatchedIndex>> {
    let element_type = query.result_type().element_type().ok_or_else(|| {
        IndexError::UnsupportedQueryShape(format!(
            "can't match indexes for {} query",
            query.result_type()
        ))
    })?;
    let labels = match query.condition_label() {
        Some(label) => vec![schema::schema_label(schema, element_type, label)?],
        None => schema.get_schema_labels(element_type)?,
    };
    let mut matched = Vec::new();
    for label in &labels {
        if let Some(index) = collect_matched_index(schema, label, query)? {
            matched.push(index);
        }
    }
    Ok(matched)
}

/// Matches the index labels of one schema label: a single or composite index first, a joint
/// of several indexes if none fits.
pub fn collect_matched_index(
    schema: &dyn SchemaProvider,
    label: &SchemaLabelRef,
    query: &ConditionQuery,
) -> IndexResult<Option<MatchedIndex>> {
    let index_labels = schema::index_labels_of(schema, label)?;
    if index_labels.is_empty() {
        return Ok(None);
    }
    let mut matched = match_single_or_composite_index(query, &index_labels);
    if matched.is_empty() {
        matched = match_joint_indexes(query, &index_labels);
    }
    Ok((!matched.is_empty()).then(|| MatchedIndex::new(label.clone(), matched)))
}

/// Returns `true` if the query keys are exactly the leading `keys.len()` fields of an index.
pub fn match_index_fields(keys: &BTreeSet<PropertyId>, fields: &[PropertyId]) -> bool {
    keys.len() <= fields.len() && fields[..keys.len()].iter().all(|f| keys.contains(f))
}

/// The first index label answering every property condition of `query` on its own.
pub fn match_single_or_composite_index(
    query: &ConditionQuery,
    index_labels: &[IndexLabelRef],
) -> Vec<IndexLabelRef> {
    let require_range = query.has_range_condition();
    let require_search = query.has_search_condition();
    let keys = query.userprop_keys();
    index_labels
        .iter()
        .find(|il| {
            let index_type = il.index_type();
            !index_type.is_unique()
                && index_type.is_search() == require_search
                && (!require_range || index_type.is_numeric())
                && match_index_fields(&keys, il.fields())
        })
        .cloned()
        .into_iter()
        .collect()
}

/// Index labels whose results, intersected, answer `query`.
///
/// Range and search conditions each need a range or search index over their key. The rest
/// of the keys must be covered by leading fields of the remaining indexes. Returns an empty
/// list if some key stays uncovered.
pub fn match_joint_indexes(
    query: &ConditionQuery,
    index_labels: &[IndexLabelRef],
) -> Vec<IndexLabelRef> {
    let mut keys = query.userprop_keys();
    let mut matched = Vec::new();
    if query.has_range_condition() || query.has_search_condition() {
        matched = match_range_or_search_index_labels(query, index_labels);
        if matched.is_empty() {
            return Vec::new();
        }
        for il in &matched {
            if let Some(field) = il.index_field() {
                keys.remove(&field);
            }
        }
        if keys.is_empty() {
            return matched;
        }
    }

    let mut covered = BTreeSet::new();
    for il in index_labels {
        let index_type = il.index_type();
        if index_type.is_search() || index_type.is_unique() || contains(&matched, il) {
            continue;
        }
        for field in il.fields() {
            if !keys.contains(field) {
                break;
            }
            if !contains(&matched, il) {
                matched.push(il.clone());
            }
            covered.insert(*field);
        }
    }
    if covered == keys { matched } else { Vec::new() }
}

/// One range or search index label per range or search condition, empty if some condition
/// has no such index over its key.
pub fn match_range_or_search_index_labels(
    query: &ConditionQuery,
    index_labels: &[IndexLabelRef],
) -> Vec<IndexLabelRef> {
    let mut matched: Vec<IndexLabelRef> = Vec::new();
    for relation in query.userprop_relations() {
        let range = relation.relation().is_range_type();
        let search = relation.relation().is_search_type();
        if !range && !search {
            continue;
        }
        let Some(key) = relation.key().user() else {
            continue;
        };
        let found = index_labels.iter().find(|il| {
            let index_type = il.index_type();
            ((range && index_type.is_range()) || (search && index_type.is_search()))
                && il.index_field() == Some(key)
        });
        match found {
            Some(il) if !contains(&matched, il) => matched.push(il.clone()),
            Some(_) => {}
            None => return Vec::new(),
        }
    }
    matched
}

fn contains(index_labels: &[IndexLabelRef], index_label: &IndexLabelRef) -> bool {
    index_labels.iter().any(|il| il.id() == index_label.id())
}
