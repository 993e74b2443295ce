//! Removal of index entries left behind by interrupted or racing element updates.
//!
//! A read may find an element through an entry whose value the element no longer carries.
//! The reader hands the query and the element to a [`LeftIndexRepairJob`], which removes
//! those entries unless the newest committed state of the element still justifies them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use graphidx_catalog::index_label::IndexLabel;
use graphidx_common::types::PropertyId;
use graphidx_common::value::ScalarValue;
use graphidx_storage::model::element::Element;
use graphidx_storage::query::{ConditionQuery, NO_LIMIT, RelationType, flatten};
use tracing::{debug, info};

use crate::builder;
use crate::engine::IndexEngine;
use crate::error::{IndexError, IndexResult};
use crate::matcher;
use crate::record::IndexRecord;
use crate::schema;
use crate::transaction::IndexTransaction;

/// Values of the query conditions an element does not carry, by property key.
type IncorrectValues = BTreeMap<PropertyId, ScalarValue>;

/// Removes the index entries that made `query` find `element` wrongly.
///
/// Every removal is committed on its own and then checked against the newest committed
/// state of the element: if that state matches the query again, the entry is restored.
/// Running the job twice removes nothing the second time.
#[derive(Debug)]
pub struct LeftIndexRepairJob {
    query: ConditionQuery,
    element: Element,
    tx: IndexTransaction,
}

impl LeftIndexRepairJob {
    pub fn new(engine: Arc<IndexEngine>, query: ConditionQuery, element: Element) -> Self {
        Self {
            query,
            element,
            tx: IndexTransaction::new(engine),
        }
    }

    /// Runs the job, returning the number of entries removed for good.
    pub fn run(mut self) -> IndexResult<u64> {
        info!(
            element = %self.element.id(),
            element_type = %self.element.element_type(),
            "removing left index"
        );
        let mut count = 0;
        for query in flatten(&self.query) {
            if query.userprop_keys().is_empty() {
                continue;
            }
            count += self.process_range_index_left(&query)?;
            count += self.process_secondary_or_search_index_left(&query)?;
        }
        self.tx.commit()?;
        Ok(count)
    }

    /// Removes the range index entries of the element matched by `query`.
    fn process_range_index_left(&mut self, query: &ConditionQuery) -> IndexResult<u64> {
        let engine = self.tx.engine().clone();
        let schema = engine.schema().as_ref();
        let label = self.element.label();
        let indexes = matcher::collect_matched_indexes(schema, query)?;
        let index = indexes
            .iter()
            .find(|index| index.schema_label().id() == label)
            .ok_or_else(|| {
                IndexError::InvariantViolation(format!(
                    "can't construct left-index query of {} {} for {query}",
                    self.element.element_type(),
                    self.element.id()
                ))
            })?;

        let mut count = 0;
        for (index_label, index_query) in builder::construct_index_queries(schema, index, query)? {
            if !index_query.result_type().is_range_index() {
                continue;
            }
            let index_query = index_query.with_page(None).with_limit(NO_LIMIT);
            let records = self
                .tx
                .query(&index_query)?
                .map(|entry| IndexRecord::from_entry(&index_label, entry?))
                .collect::<IndexResult<Vec<_>>>()?;
            for record in records {
                if !record.element_ids().contains(self.element.id()) {
                    continue;
                }
                let record = record.reset_element_ids(self.element.id().clone());
                self.tx.do_eliminate(&record);
                self.tx.commit()?;
                if self.deleted_by_error(query)? {
                    debug!(
                        index_label = index_label.name(),
                        field_values = record.field_values(),
                        "restoring range index entry matching the newest element"
                    );
                    self.tx.do_append(&record);
                    self.tx.commit()?;
                } else {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Removes the secondary and search index entries built from the values `query` expected
    /// but the element does not carry.
    fn process_secondary_or_search_index_left(
        &mut self,
        query: &ConditionQuery,
    ) -> IndexResult<u64> {
        let Some((error_element, incorrect)) = self.construct_error_element(query)? else {
            return Ok(0);
        };
        if incorrect.is_empty() {
            return Ok(0);
        }
        let engine = self.tx.engine().clone();
        let schema = engine.schema().as_ref();
        let label = schema::schema_label(
            schema,
            self.element.element_type(),
            self.element.label(),
        )?;

        let mut count = 0;
        for index_label in schema::index_labels_of(schema, &label)? {
            let fields: Vec<PropertyId> = index_label
                .fields()
                .iter()
                .copied()
                .filter(|field| incorrect.contains_key(field))
                .collect();
            if fields.is_empty() {
                continue;
            }
            if index_label.index_type().is_search()
                && self.search_matches(&engine, &index_label, query)
            {
                continue;
            }
            if !self.has_stale_entries(&engine, &index_label, &error_element)? {
                continue;
            }

            self.tx.update_index(index_label.id(), &error_element, true)?;
            // Prefix entries shared with the actual values were eliminated too.
            if index_label.index_type().is_secondary() {
                self.tx.update_index(index_label.id(), &self.element, false)?;
            }
            self.tx.commit()?;

            if self.deleted_by_error_fields(&fields, &incorrect)? {
                debug!(
                    index_label = index_label.name(),
                    "restoring index entries matching the newest element"
                );
                self.tx.update_index(index_label.id(), &error_element, false)?;
                self.tx.commit()?;
            } else {
                count += 1;
            }
        }
        Ok(count)
    }

    /// A copy of the element carrying the values `query` expects, with the values the element
    /// actually lacks. `None` if a key is constrained to more than one value.
    ///
    /// Keys constrained by other relations than equality or text containment are left alone.
    fn construct_error_element(
        &self,
        query: &ConditionQuery,
    ) -> IndexResult<Option<(Element, IncorrectValues)>> {
        let schema = self.tx.engine().schema().as_ref();
        let mut error_element = self.element.clone();
        let mut incorrect = IncorrectValues::new();
        for key in query.userprop_keys() {
            let relations = query.userprop_conditions_of(key);
            if relations
                .iter()
                .any(|r| !matches!(r.relation(), RelationType::Eq | RelationType::TextContains))
            {
                continue;
            }
            let values = query.userprop_values(key);
            let value = match values.as_slice() {
                [value] => value,
                [] => {
                    return Err(IndexError::InvariantViolation(format!(
                        "expect user property values for key {key}, but got none"
                    )));
                }
                _ => return Ok(None),
            };
            let Some(value) = schema::property_key(schema, key)?.convert(value) else {
                return Ok(None);
            };
            if self.element.property(key) != Some(&value) {
                error_element.set_property(key, value.clone());
                incorrect.insert(key, value);
            }
        }
        Ok(Some((error_element, incorrect)))
    }

    /// Whether the actual text of the element shares a word with the condition text, so that
    /// its search entries are justified.
    fn search_matches(
        &self,
        engine: &IndexEngine,
        index_label: &IndexLabel,
        query: &ConditionQuery,
    ) -> bool {
        let Some(field) = index_label.index_field() else {
            return false;
        };
        let actual = self.element.property(field).and_then(ScalarValue::as_text);
        let expected = query.userprop_value(field).and_then(ScalarValue::as_text);
        match (actual, expected) {
            (Some(actual), Some(expected)) => engine.match_search_index_words(actual, expected),
            _ => false,
        }
    }

    /// Whether the store still indexes the element under a value only the error element has.
    fn has_stale_entries(
        &self,
        engine: &IndexEngine,
        index_label: &IndexLabel,
        error_element: &Element,
    ) -> IndexResult<bool> {
        let actual: BTreeSet<String> =
            engine.index_values(index_label, &self.element)?.into_iter().collect();
        for value in engine.index_values(index_label, error_element)? {
            if actual.contains(&value) {
                continue;
            }
            if engine.index_entry_exists(index_label, &value, self.element.id())? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the newest state of the element matches `query`, which means the removed
    /// entries were not stale.
    fn deleted_by_error(&self, query: &ConditionQuery) -> IndexResult<bool> {
        let newest = self.tx.engine().newest_element(&self.element)?;
        Ok(newest.is_some_and(|element| query.test(&element)))
    }

    /// Whether the newest state of the element carries one of the incorrect values again.
    fn deleted_by_error_fields(
        &self,
        fields: &[PropertyId],
        incorrect: &IncorrectValues,
    ) -> IndexResult<bool> {
        let Some(newest) = self.tx.engine().newest_element(&self.element)? else {
            return Ok(false);
        };
        Ok(fields
            .iter()
            .any(|field| newest.property(*field) == incorrect.get(field)))
    }
}
