//! The read path: answering a flattened element query with the ids found in index entries.

use std::collections::BTreeSet;
use std::sync::Arc;

use graphidx_catalog::index_label::IndexLabel;
use graphidx_common::value::ScalarValue;
use graphidx_storage::model::element::Element;
use graphidx_storage::query::{Condition, ConditionQuery, ResultsFilter, SysKey, flatten};
use itertools::Itertools;
use tracing::debug;

use crate::builder::{self, IndexQueries};
use crate::error::{IndexError, IndexResult};
use crate::holder::{IdHolder, IdHolderList};
use crate::id_set::IdSet;
use crate::matcher::{self, MatchedIndex};
use crate::schema;
use crate::transaction::IndexTransaction;

impl IndexTransaction {
    /// Finds the ids of the elements matching a flattened query through the indexes.
    ///
    /// The query may hold at most one system condition, an equality on the label. A query on
    /// the label alone scans the label index; any other query is answered by the index labels
    /// matching its property conditions. Must not be called with uncommitted changes.
    pub fn query_index(&self, query: &ConditionQuery) -> IndexResult<IdHolderList> {
        query
            .check_flattened()
            .map_err(|e| IndexError::UnsupportedQueryShape(e.to_string()))?;
        if self.has_updates() {
            return Err(IndexError::UnsupportedQueryShape(
                "can't do index query when there are changes in transaction".to_string(),
            ));
        }
        let sysprop_conditions = query.sysprop_conditions();
        if sysprop_conditions.len() > 1
            || (sysprop_conditions.len() == 1 && !query.contains_condition(SysKey::Label))
        {
            return Err(IndexError::UnsupportedQueryShape(format!(
                "can't do index query with [{}]",
                sysprop_conditions.iter().join(", ")
            )));
        }
        if query.all_sysprop() && sysprop_conditions.len() == 1 {
            self.query_by_label(query)
        } else {
            self.query_by_userprop(query)
        }
    }

    /// Runs [`IndexTransaction::query_index`] and drains every holder.
    ///
    /// Results filters of search queries are not applied, the ids may include elements that
    /// only share a word with the query text.
    pub fn query_ids(&self, query: &ConditionQuery) -> IndexResult<IdSet> {
        let batch = self.engine().config().query_batch_size;
        let mut ids = IdSet::new();
        for mut holder in self.query_index(query)? {
            ids.extend(holder.fetch_all(batch)?);
        }
        Ok(ids)
    }

    fn query_by_label(&self, query: &ConditionQuery) -> IndexResult<IdHolderList> {
        let engine = self.engine();
        let element_type = query.result_type().element_type().ok_or_else(|| {
            IndexError::UnsupportedQueryShape(format!(
                "can't query {} by label",
                query.result_type()
            ))
        })?;
        let label = query.condition_label().ok_or_else(|| {
            IndexError::UnsupportedQueryShape(format!("expect an equal label condition in {query}"))
        })?;
        let schema_label = schema::schema_label(engine.schema().as_ref(), element_type, label)?;
        if engine.store().features().supports_query_by_label {
            return Err(IndexError::UnsupportedQueryShape(format!(
                "the store answers queries by label '{}' itself",
                schema_label.name()
            )));
        }
        if !schema_label.enable_label_index() {
            return Err(IndexError::NoIndexPath(format!(
                "don't accept query by label '{}', it disables label index",
                schema_label.name()
            )));
        }
        let label_index = IndexLabel::label_index(element_type);
        let index_query = builder::construct_label_query(query, &label_index, label);
        let holder = engine.do_index_query(Arc::new(label_index), index_query)?;
        let mut holders = IdHolderList::new(query.paging());
        holders.add(holder)?;
        Ok(holders)
    }

    fn query_by_userprop(&self, query: &ConditionQuery) -> IndexResult<IdHolderList> {
        if query.userprop_keys().is_empty() {
            return Err(IndexError::UnsupportedQueryShape(format!(
                "no property condition to query by index in {query}"
            )));
        }
        let schema = self.engine().schema().as_ref();
        let indexes = matcher::collect_matched_indexes(schema, query)?;
        if indexes.is_empty() {
            return Err(self.no_index_error(query)?);
        }
        let paging = query.paging();
        let mut holders = IdHolderList::new(paging);
        if self.engine().config().check_value_types && !self.valid_query_condition_values(query)? {
            debug!(%query, "condition values don't conform to their property keys");
            return Ok(holders);
        }
        for index in &indexes {
            if paging && index.is_joint() {
                return Err(IndexError::UnsupportedQueryShape(format!(
                    "can't do joint index query in paging for {query}"
                )));
            }
            if index.contains_search_index() {
                holders.append(self.do_search_index(query, index)?)?;
            } else {
                let queries = builder::construct_index_queries(schema, index, query)?;
                holders.add(self.do_index_queries(queries)?)?;
            }
            if query.reach_limit(holders.ids_size()) {
                break;
            }
        }
        Ok(holders)
    }

    fn do_search_index(
        &self,
        query: &ConditionQuery,
        index: &MatchedIndex,
    ) -> IndexResult<IdHolderList> {
        let schema = self.engine().schema().as_ref();
        let query = self.construct_search_query(query, index)?;
        let mut holders = IdHolderList::new(query.paging());
        holders.set_results_filter(query.results_filter().cloned());
        for flattened in flatten(&query) {
            let queries = builder::construct_index_queries(schema, index, &flattened)?;
            holders.add(self.do_index_queries(queries)?)?;
        }
        Ok(holders)
    }

    /// Replaces the text of each search condition with "contains any word of the text" and
    /// registers a filter re-checking the original conditions on loaded elements.
    fn construct_search_query(
        &self,
        query: &ConditionQuery,
        index: &MatchedIndex,
    ) -> IndexResult<ConditionQuery> {
        let origin = query.clone();
        let mut query = query.clone();
        let mut index_fields = BTreeSet::new();
        for index_label in index.index_labels() {
            if !index_label.index_type().is_search() {
                continue;
            }
            let Some(field) = index_label.index_field() else {
                continue;
            };
            let text = query
                .userprop_value(field)
                .and_then(ScalarValue::as_text)
                .ok_or_else(|| {
                    IndexError::UnsupportedQueryShape(format!(
                        "search index '{}' expects a text condition in {query}",
                        index_label.name()
                    ))
                })?
                .to_string();
            let words = self.engine().segment(&text);
            index_fields.insert(field);
            query = query
                .without_userprop(field)
                .with_condition(Condition::text_contains_any(field, words));
        }

        let engine = self.engine().clone();
        let filter: ResultsFilter = Arc::new(move |element: &Element| {
            origin.conditions().iter().all(|condition| {
                let search_field = condition
                    .as_relation()
                    .and_then(|r| r.key().user())
                    .filter(|key| index_fields.contains(key));
                match search_field {
                    Some(field) => {
                        let prop = element.property(field).and_then(ScalarValue::as_text);
                        let text = origin.userprop_value(field).and_then(ScalarValue::as_text);
                        match (prop, text) {
                            (Some(prop), Some(text)) => {
                                engine.match_search_index_words(prop, text)
                            }
                            _ => false,
                        }
                    }
                    None => condition.test(element),
                }
            })
        });
        Ok(query.with_results_filter(filter))
    }

    fn do_index_queries(&self, queries: IndexQueries) -> IndexResult<IdHolder> {
        match <[_; 1]>::try_from(queries) {
            Ok([(index_label, query)]) => self.engine().do_index_query(index_label, query),
            Err(queries) => self.do_joint_index(queries),
        }
    }

    /// Intersects the ids of several unpaged index queries, stopping at the first empty
    /// intersection.
    fn do_joint_index(&self, queries: IndexQueries) -> IndexResult<IdHolder> {
        let mut intersection: Option<IdSet> = None;
        for (index_label, query) in queries {
            let (ids, _) = self.engine().scan_index(&index_label, &query)?.into_parts();
            let ids = match intersection.take() {
                None => ids,
                Some(mut acc) => {
                    acc.retain_all(&ids);
                    acc
                }
            };
            let empty = ids.is_empty();
            intersection = Some(ids);
            if empty {
                break;
            }
        }
        Ok(IdHolder::Batch(intersection.unwrap_or_default()))
    }

    fn no_index_error(&self, query: &ConditionQuery) -> IndexResult<IndexError> {
        let schema = self.engine().schema().as_ref();
        let label = match (query.condition_label(), query.result_type().element_type()) {
            (Some(label), Some(element_type)) => {
                format!("label '{}'", schema::schema_label(schema, element_type, label)?.name())
            }
            _ => "any label".to_string(),
        };
        let mut keys = Vec::new();
        for key in query.userprop_keys() {
            keys.push(schema::property_key(schema, key)?.name().to_string());
        }
        let mut mismatched = Vec::new();
        if query.has_secondary_condition() {
            mismatched.push("secondary");
        }
        if query.has_range_condition() {
            mismatched.push("range");
        }
        if query.has_search_condition() {
            mismatched.push("search");
        }
        Ok(IndexError::NoIndexPath(format!(
            "don't accept query based on properties [{}] that are not indexed in {label}, \
             may not match {} condition",
            keys.join(", "),
            mismatched.join("/")
        )))
    }

    /// Whether every condition value conforms to the data type of its property key.
    fn valid_query_condition_values(&self, query: &ConditionQuery) -> IndexResult<bool> {
        let schema = self.engine().schema().as_ref();
        for key in query.userprop_keys() {
            let property_key = schema::property_key(schema, key)?;
            let values = query.userprop_values(key);
            if values.is_empty() {
                return Err(IndexError::InvariantViolation(format!(
                    "expect user property values for key '{}', but got none",
                    property_key.name()
                )));
            }
            if values.iter().any(|value| !property_key.check_value(value)) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
