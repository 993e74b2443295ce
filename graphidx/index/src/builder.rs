//! Translating element queries into queries over index entries.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use graphidx_catalog::index_label::{IndexLabel, IndexType};
use graphidx_catalog::provider::{IndexLabelRef, SchemaProvider};
use graphidx_common::types::{LabelId, PropertyId};
use graphidx_common::value::ScalarValue;
use graphidx_storage::query::{Condition, ConditionQuery, Relation, RelationType};
use tracing::debug;

use crate::codec;
use crate::combination::first_combination;
use crate::error::{IndexError, IndexResult};
use crate::matcher::{self, MatchedIndex};
use crate::schema;

/// Index queries paired with the index label each one scans.
pub type IndexQueries = Vec<(IndexLabelRef, ConditionQuery)>;

/// The query of the label index answering "elements with `label`".
///
/// The index query scans `query.total()` entries from the page of `query`; the offset is left
/// to the caller.
pub fn construct_label_query(
    query: &ConditionQuery,
    label_index: &IndexLabel,
    label: LabelId,
) -> ConditionQuery {
    ConditionQuery::index(label_index.table(), label_index.id())
        .with_field_values(RelationType::Eq, codec::label_value(label))
        .with_page(query.page().map(str::to_string))
        .with_limit(query.total())
}

/// Builds the index queries of a matched index.
///
/// A single index label yields one query carrying the page and limit of `query`. A joint
/// match yields one unpaged query per index label, whose results are to be intersected.
pub fn construct_index_queries(
    schema: &dyn SchemaProvider,
    matched: &MatchedIndex,
    query: &ConditionQuery,
) -> IndexResult<IndexQueries> {
    if let [index_label] = matched.index_labels() {
        let index_query = construct_query(schema, query, index_label)?.ok_or_else(|| {
            IndexError::InvariantViolation(format!(
                "index label '{}' can't answer {query}",
                index_label.name()
            ))
        })?;
        let index_query = index_query
            .with_page(query.page().map(str::to_string))
            .with_limit(query.total());
        return Ok(vec![(index_label.clone(), index_query)]);
    }
    let queries = build_joint_indexes_queries(schema, query, matched)?;
    if queries.is_empty() {
        return Err(IndexError::InvariantViolation(format!(
            "can't construct joint index queries of label '{}' for {query}",
            matched.schema_label().name()
        )));
    }
    Ok(queries)
}

fn build_joint_indexes_queries(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
    matched: &MatchedIndex,
) -> IndexResult<IndexQueries> {
    let mut queries = IndexQueries::new();
    let mut remaining: Vec<IndexLabelRef> = matched.index_labels().to_vec();
    let mut query = query.clone();

    if query.has_range_condition() || query.has_search_condition() {
        let index_labels =
            matcher::match_range_or_search_index_labels(&query, matched.index_labels());
        if index_labels.is_empty() {
            return Err(IndexError::InvariantViolation(format!(
                "no range or search index of label '{}' for {query}",
                matched.schema_label().name()
            )));
        }
        remaining.retain(|il| index_labels.iter().all(|matched| matched.id() != il.id()));
        let keys: BTreeSet<PropertyId> =
            index_labels.iter().filter_map(|il| il.index_field()).collect();
        queries.extend(construct_queries(schema, &query, &index_labels, &keys)?);
        for key in &keys {
            query = query.without_userprop(*key);
        }
        if query.userprop_keys().is_empty() {
            return Ok(queries);
        }
    }

    // The smallest combination of the remaining labels covering the remaining keys.
    for n in 1..=remaining.len() {
        let mut failure = None;
        let mut found = IndexQueries::new();
        let combination = first_combination(&remaining, n, |index_labels| {
            match construct_joint_secondary_queries(schema, &query, index_labels) {
                Ok(sub_queries) if !sub_queries.is_empty() => {
                    found = sub_queries;
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    failure = Some(e);
                    true
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        if combination.is_some() {
            queries.extend(found);
            return Ok(queries);
        }
    }
    Ok(IndexQueries::new())
}

fn construct_joint_secondary_queries(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
    index_labels: &[IndexLabelRef],
) -> IndexResult<IndexQueries> {
    let matched = matcher::match_joint_indexes(query, index_labels);
    if matched.is_empty() {
        return Ok(IndexQueries::new());
    }
    construct_queries(schema, query, &matched, &query.userprop_keys())
}

/// One index query per index label, each restricted to the conditions over the leading
/// fields of its label that are in `prop_keys`.
pub fn construct_queries(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
    index_labels: &[IndexLabelRef],
    prop_keys: &BTreeSet<PropertyId>,
) -> IndexResult<IndexQueries> {
    index_labels
        .iter()
        .map(|index_label| {
            let mut conditions = Vec::new();
            for field in index_label.fields() {
                if !prop_keys.contains(field) {
                    break;
                }
                conditions.extend(
                    query
                        .userprop_conditions_of(*field)
                        .into_iter()
                        .cloned()
                        .map(Condition::from),
                );
            }
            let sub_query = query
                .clone()
                .with_userprop_conditions_reset()
                .with_conditions(conditions);
            let index_query =
                construct_query(schema, &sub_query, index_label)?.ok_or_else(|| {
                    IndexError::InvariantViolation(format!(
                        "index label '{}' can't answer {sub_query}",
                        index_label.name()
                    ))
                })?;
            Ok((index_label.clone(), index_query))
        })
        .collect()
}

/// The query over the entries of `index_label` answering the property conditions of `query`,
/// `None` if the index label can't answer them.
pub fn construct_query(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
    index_label: &IndexLabel,
) -> IndexResult<Option<ConditionQuery>> {
    let index_type = index_label.index_type();
    if query.has_range_condition() && !index_type.is_numeric() {
        debug!(
            index_label = index_label.name(),
            %index_type,
            "range condition on non-numeric index"
        );
        return Ok(None);
    }
    let keys = query.userprop_keys();
    let fields = index_label.fields();
    if !matcher::match_index_fields(&keys, fields) {
        return Ok(None);
    }
    debug!(index_label = index_label.name(), ?fields, "matched index fields");

    let index_query = ConditionQuery::index(index_label.table(), index_label.id());
    let index_query = match index_type {
        IndexType::Search => {
            let field = index_label.index_field().ok_or_else(|| {
                IndexError::InvariantViolation(format!(
                    "search index '{}' has no field",
                    index_label.name()
                ))
            })?;
            let text = query
                .userprop_value(field)
                .and_then(ScalarValue::as_text)
                .ok_or_else(|| {
                    IndexError::UnsupportedQueryShape(format!(
                        "search index '{}' expects a text condition in {query}",
                        index_label.name()
                    ))
                })?;
            index_query.with_field_values(RelationType::Eq, text)
        }
        IndexType::Secondary => {
            let texts = fields[..keys.len()]
                .iter()
                .map(|field| equal_value(schema, query, *field).map(|v| v.to_string()))
                .collect::<IndexResult<Vec<_>>>()?;
            index_query.with_field_values(RelationType::Eq, codec::concat(&texts)?)
        }
        IndexType::RangeInt
        | IndexType::RangeLong
        | IndexType::RangeFloat
        | IndexType::RangeDouble => {
            let relations: Vec<&Relation> = query.userprop_relations().collect();
            if relations.len() > 2 {
                return Err(IndexError::UnsupportedQueryShape(format!(
                    "range index query has two conditions at most, but got {}",
                    relations.len()
                )));
            }
            let mut index_query = index_query;
            for relation in relations {
                let value = relation_value(schema, relation)?;
                index_query = index_query.with_field_values(
                    relation.relation(),
                    codec::encode_range_value(index_type, &value)?,
                );
            }
            index_query
        }
        IndexType::Shard => construct_shard_conditions(schema, query, fields)?
            .into_iter()
            .fold(index_query, |q, (relation, value)| q.with_field_values(relation, value)),
        IndexType::Unique => {
            return Err(IndexError::UnsupportedQueryShape(format!(
                "unique index '{}' can't be queried",
                index_label.name()
            )));
        }
    };
    Ok(Some(index_query))
}

fn equal_value(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
    key: PropertyId,
) -> IndexResult<ScalarValue> {
    let value = query
        .userprop_conditions_of(key)
        .into_iter()
        .find(|r| r.relation() == RelationType::Eq)
        .and_then(|r| r.value().as_scalar())
        .ok_or_else(|| {
            IndexError::UnsupportedQueryShape(format!(
                "secondary index expects an equality condition over #{key} in {query}"
            ))
        })?;
    schema::convert_value(schema, key, value)
}

fn relation_value(schema: &dyn SchemaProvider, relation: &Relation) -> IndexResult<ScalarValue> {
    let key = relation.key().user();
    match (key, relation.value().as_scalar()) {
        (Some(key), Some(value)) => schema::convert_value(schema, key, value),
        _ => Err(IndexError::UnsupportedQueryShape(format!(
            "expect a property condition with a single value, but got {relation}"
        ))),
    }
}

/// Bounds collected from the conditions over one key.
#[derive(Debug, Default)]
struct RangeConditions {
    eq: Option<ScalarValue>,
    /// Lower bound and whether it is inclusive.
    min: Option<(ScalarValue, bool)>,
    max: Option<(ScalarValue, bool)>,
}

impl RangeConditions {
    fn new(schema: &dyn SchemaProvider, relations: &[&Relation]) -> IndexResult<Self> {
        let mut range = Self::default();
        for relation in relations {
            let value = relation_value(schema, relation)?;
            match relation.relation() {
                RelationType::Eq => range.eq = Some(value),
                RelationType::Gt => tighten(&mut range.min, value, false, Ordering::Greater),
                RelationType::Gte => tighten(&mut range.min, value, true, Ordering::Greater),
                RelationType::Lt => tighten(&mut range.max, value, false, Ordering::Less),
                RelationType::Lte => tighten(&mut range.max, value, true, Ordering::Less),
                other => {
                    return Err(IndexError::UnsupportedQueryShape(format!(
                        "shard index can't answer {other} condition {relation}"
                    )));
                }
            }
        }
        Ok(range)
    }

    #[inline]
    fn has_range(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// Keeps the stricter of the current bound and `value`. `stricter` is the ordering a value
/// has to its bound to replace it.
fn tighten(
    bound: &mut Option<(ScalarValue, bool)>,
    value: ScalarValue,
    inclusive: bool,
    stricter: Ordering,
) {
    let replace = match bound {
        None => true,
        Some((current, current_inclusive)) => match value.compare(current) {
            Some(ordering) if ordering == stricter => true,
            Some(Ordering::Equal) => *current_inclusive && !inclusive,
            _ => false,
        },
    };
    if replace {
        *bound = Some((value, inclusive));
    }
}

/// Field value conditions of a shard index query.
///
/// Leading equality conditions form a prefix. The first range condition bounds the number
/// following the prefix, an open side being bounded by the extreme value of the key type.
/// Without a range condition the prefix is matched exactly if it covers all fields, as a
/// prefix range otherwise.
fn construct_shard_conditions(
    schema: &dyn SchemaProvider,
    query: &ConditionQuery,
    fields: &[PropertyId],
) -> IndexResult<Vec<(RelationType, String)>> {
    let invalid =
        || IndexError::UnsupportedQueryShape(format!("invalid shard index query: {query}"));
    let mut prefix: Vec<String> = Vec::new();
    let mut processed = 0;
    let mut conditions = Vec::with_capacity(2);
    for field in fields {
        let relations = query.userprop_conditions_of(*field);
        if relations.is_empty() {
            break;
        }
        processed += 1;
        let range = RangeConditions::new(schema, &relations)?;
        if !range.has_range() {
            let value = range.eq.ok_or_else(invalid)?;
            prefix.push(codec::encode_if_numeric(&value)?);
            continue;
        }
        let data_type = schema::property_key(schema, *field)?.data_type();
        let min = match range.min {
            Some((value, true)) => (RelationType::Gte, codec::encode_number(&value)?),
            Some((value, false)) => (RelationType::Gt, codec::encode_number(&value)?),
            None => (RelationType::Gte, codec::min_value_of(data_type)?),
        };
        let max = match range.max {
            Some((value, true)) => (RelationType::Lte, codec::encode_number(&value)?),
            Some((value, false)) => (RelationType::Lt, codec::encode_number(&value)?),
            None => (RelationType::Lte, codec::max_value_of(data_type)?),
        };
        conditions.push(shard_field_values_condition(&prefix, min)?);
        conditions.push(shard_field_values_condition(&prefix, max)?);
        break;
    }
    if processed < query.userprop_keys().len() {
        return Err(invalid());
    }
    if !conditions.is_empty() {
        return Ok(conditions);
    }
    if prefix.len() == fields.len() {
        conditions.push((RelationType::Eq, codec::concat(&prefix)?));
        return Ok(conditions);
    }
    prefix.push(String::new());
    let start = codec::concat(&prefix)?;
    let end = codec::increment_last_char(&start)?;
    conditions.push((RelationType::Gte, start));
    conditions.push((RelationType::Lt, end));
    Ok(conditions)
}

/// A bound of the number following `prefix`. Exclusive lower and inclusive upper bounds are
/// turned around by incrementing the number, so that entries continuing after the number are
/// bounded correctly.
fn shard_field_values_condition(
    prefix: &[String],
    (relation, number): (RelationType, String),
) -> IndexResult<(RelationType, String)> {
    let (relation, number) = match relation {
        RelationType::Gt => (RelationType::Gte, codec::increment_last_char(&number)?),
        RelationType::Lte => (RelationType::Lt, codec::increment_last_char(&number)?),
        other => (other, number),
    };
    let mut values = prefix.to_vec();
    values.push(number);
    Ok((relation, codec::concat_values(&values)))
}
