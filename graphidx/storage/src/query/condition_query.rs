use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use graphidx_common::table::IndexTable;
use graphidx_common::types::{ElementType, IndexLabelId, LabelId, PropertyId};
use graphidx_common::value::ScalarValue;
use itertools::Itertools;

use super::condition::{Condition, ConditionKey, ConditionValue, Relation, RelationType, SysKey};
use crate::error::{StorageError, StorageResult};
use crate::model::element::Element;

/// Limit of a query without a limit.
pub const NO_LIMIT: u64 = u64::MAX;

pub type ResultsFilter = Arc<dyn Fn(&Element) -> bool + Send + Sync>;

/// What a query returns: elements, or entries of an index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Element(ElementType),
    Index(IndexTable),
}

impl QueryType {
    #[inline]
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            QueryType::Element(ty) => Some(*ty),
            QueryType::Index(_) => None,
        }
    }

    #[inline]
    pub fn index_table(&self) -> Option<IndexTable> {
        match self {
            QueryType::Index(table) => Some(*table),
            QueryType::Element(_) => None,
        }
    }

    #[inline]
    pub fn is_range_index(&self) -> bool {
        self.index_table().is_some_and(|t| t.is_range())
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Element(ty) => write!(f, "{ty}"),
            QueryType::Index(table) => write!(f, "{table}"),
        }
    }
}

/// A conjunction of conditions with paging state.
///
/// Queries are values: every builder consumes `self` and returns a new query, so sub-queries
/// derived from a shared base never alias each other.
#[derive(Clone)]
pub struct ConditionQuery {
    result_type: QueryType,
    conditions: Vec<Condition>,
    page: Option<String>,
    offset: u64,
    limit: u64,
    results_filter: Option<ResultsFilter>,
}

impl ConditionQuery {
    #[inline]
    pub fn new(result_type: QueryType) -> Self {
        Self {
            result_type,
            conditions: Vec::new(),
            page: None,
            offset: 0,
            limit: NO_LIMIT,
            results_filter: None,
        }
    }

    #[inline]
    pub fn vertices() -> Self {
        Self::new(QueryType::Element(ElementType::Vertex))
    }

    #[inline]
    pub fn edges() -> Self {
        Self::new(QueryType::Element(ElementType::Edge))
    }

    /// A query over the entries of one index label in `table`.
    pub fn index(table: IndexTable, index_label: IndexLabelId) -> Self {
        Self::new(QueryType::Index(table)).with_condition(Condition::sys(
            SysKey::IndexLabelId,
            RelationType::Eq,
            ConditionValue::IndexLabel(index_label),
        ))
    }

    #[inline]
    pub fn result_type(&self) -> QueryType {
        self.result_type
    }

    #[inline]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_conditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Replaces all conditions, keeping result type, paging state and filter.
    pub fn with_conditions_replaced(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    #[inline]
    pub fn has(
        self,
        key: PropertyId,
        relation: RelationType,
        value: impl Into<ScalarValue>,
    ) -> Self {
        self.with_condition(Condition::user(key, relation, value.into()))
    }

    #[inline]
    pub fn has_label(self, label: LabelId) -> Self {
        self.with_condition(Condition::label(label))
    }

    /// Equality on the encoded field values of an index query.
    #[inline]
    pub fn with_field_values(self, relation: RelationType, value: impl Into<String>) -> Self {
        self.with_condition(Condition::sys(
            SysKey::FieldValues,
            relation,
            ScalarValue::String(value.into()),
        ))
    }

    #[inline]
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    /// Sets the page token. An empty token starts paging from the first page.
    pub fn with_page(mut self, page: Option<String>) -> Self {
        self.page = page;
        self
    }

    /// Whether the query is executed page by page.
    #[inline]
    pub fn paging(&self) -> bool {
        self.page.is_some()
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[inline]
    pub fn no_limit(&self) -> bool {
        self.limit == NO_LIMIT
    }

    /// Number of results to produce before the offset is skipped.
    #[inline]
    pub fn total(&self) -> u64 {
        if self.no_limit() {
            NO_LIMIT
        } else {
            self.offset.saturating_add(self.limit)
        }
    }

    #[inline]
    pub fn reach_limit(&self, count: u64) -> bool {
        !self.no_limit() && count >= self.total()
    }

    #[inline]
    pub fn results_filter(&self) -> Option<&ResultsFilter> {
        self.results_filter.as_ref()
    }

    pub fn with_results_filter(mut self, filter: ResultsFilter) -> Self {
        self.results_filter = Some(filter);
        self
    }

    /// Applies the registered results filter. Without a filter every element passes.
    #[inline]
    pub fn filter_result(&self, element: &Element) -> bool {
        self.results_filter.as_ref().is_none_or(|f| f(element))
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.conditions.iter().flat_map(Condition::relations)
    }

    pub fn sysprop_conditions(&self) -> Vec<&Condition> {
        self.conditions.iter().filter(|c| c.is_sysprop()).collect()
    }

    pub fn userprop_conditions(&self) -> Vec<&Condition> {
        self.conditions.iter().filter(|c| !c.is_sysprop()).collect()
    }

    /// Relations over the user property `key`.
    pub fn userprop_conditions_of(&self, key: PropertyId) -> Vec<&Relation> {
        self.relations()
            .filter(|r| r.key() == ConditionKey::User(key))
            .collect()
    }

    pub fn userprop_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations().filter(|r| !r.is_sysprop())
    }

    pub fn userprop_keys(&self) -> BTreeSet<PropertyId> {
        self.relations().filter_map(|r| r.key().user()).collect()
    }

    /// The value of the first equality or text relation over `key`.
    pub fn userprop_value(&self, key: PropertyId) -> Option<&ScalarValue> {
        self.relations()
            .filter(|r| r.key() == ConditionKey::User(key))
            .find(|r| matches!(r.relation(), RelationType::Eq | RelationType::TextContains))
            .and_then(|r| r.value().as_scalar())
    }

    /// Distinct values of all relations over `key`.
    pub fn userprop_values(&self, key: PropertyId) -> Vec<ScalarValue> {
        let mut values: Vec<ScalarValue> = Vec::new();
        for value in self
            .relations()
            .filter(|r| r.key() == ConditionKey::User(key))
            .flat_map(|r| r.value().scalars())
        {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }

    pub fn has_range_condition(&self) -> bool {
        self.userprop_relations()
            .any(|r| r.relation().is_range_type())
    }

    pub fn has_search_condition(&self) -> bool {
        self.userprop_relations()
            .any(|r| r.relation().is_search_type())
    }

    pub fn has_secondary_condition(&self) -> bool {
        self.userprop_relations()
            .any(|r| r.relation().is_secondary_type())
    }

    #[inline]
    pub fn contains_condition(&self, key: SysKey) -> bool {
        self.relations().any(|r| r.key() == ConditionKey::Sys(key))
    }

    /// The value of the first equality relation over a system key.
    pub fn condition(&self, key: SysKey) -> Option<&ConditionValue> {
        self.relations()
            .find(|r| r.key() == ConditionKey::Sys(key) && r.relation() == RelationType::Eq)
            .map(Relation::value)
    }

    pub fn condition_label(&self) -> Option<LabelId> {
        match self.condition(SysKey::Label) {
            Some(ConditionValue::Label(label)) => Some(*label),
            _ => None,
        }
    }

    pub fn condition_index_label(&self) -> Option<IndexLabelId> {
        match self.condition(SysKey::IndexLabelId) {
            Some(ConditionValue::IndexLabel(il)) => Some(*il),
            _ => None,
        }
    }

    /// Whether every condition is over a system key.
    #[inline]
    pub fn all_sysprop(&self) -> bool {
        self.conditions.iter().all(Condition::is_sysprop)
    }

    #[inline]
    pub fn is_flattened(&self) -> bool {
        self.conditions.iter().all(Condition::is_flattened)
    }

    pub fn check_flattened(&self) -> StorageResult<()> {
        if self.is_flattened() {
            Ok(())
        } else {
            Err(StorageError::UnsupportedQuery(format!(
                "query is not flattened: {self}"
            )))
        }
    }

    /// A copy of this query without any condition over the user property `key`.
    pub fn without_userprop(mut self, key: PropertyId) -> Self {
        self.conditions.retain(|c| {
            !c.relations()
                .iter()
                .any(|r| r.key() == ConditionKey::User(key))
        });
        self
    }

    /// A copy of this query keeping only its system conditions.
    pub fn with_userprop_conditions_reset(mut self) -> Self {
        self.conditions.retain(Condition::is_sysprop);
        self
    }

    /// Tests an element against all conditions.
    pub fn test(&self, element: &Element) -> bool {
        self.conditions.iter().all(|c| c.test(element))
    }
}

impl fmt::Debug for ConditionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionQuery")
            .field("result_type", &self.result_type)
            .field("conditions", &self.conditions)
            .field("page", &self.page)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("results_filter", &self.results_filter.is_some())
            .finish()
    }
}

impl fmt::Display for ConditionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` where [{}]",
            self.result_type,
            self.conditions.iter().join(", ")
        )?;
        if let Some(page) = &self.page {
            write!(f, " page '{page}'")?;
        }
        if !self.no_limit() {
            write!(f, " limit {}", self.limit)?;
        }
        Ok(())
    }
}
