use std::collections::HashMap;
use std::ops::Bound;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use crossbeam_skiplist::SkipSet;
use graphidx_common::id::Id;
use graphidx_common::table::IndexTable;
use graphidx_common::types::IndexLabelId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::{StorageError, StorageResult};
use crate::query::{ConditionKey, ConditionQuery, RelationType, SysKey};
use crate::store::{
    Action, BackendEntry, BackendMutation, BackendStore, EntryIterator, EntryIteratorRef,
    PageMetadata, StoreFeatures,
};

/// One `(index label, field values, element id)` triple. The derived order is the scan order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct IndexRow {
    index_label: IndexLabelId,
    field_values: String,
    element_id: Id,
}

impl IndexRow {
    #[inline]
    fn first_of(index_label: IndexLabelId, field_values: String) -> Self {
        Self {
            index_label,
            field_values,
            element_id: Id::MIN,
        }
    }
}

/// An ordered in-memory index store. Each index table is a skip list of rows, so that equality,
/// range and prefix scans are all range scans.
#[derive(Debug)]
pub struct MemoryStore {
    features: StoreFeatures,
    tables: HashMap<IndexTable, SkipSet<IndexRow>>,
    commit_lock: Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a store that needs label indexes and supports paging.
    pub fn new() -> Self {
        Self::with_features(StoreFeatures {
            supports_query_by_label: false,
            supports_paging: true,
        })
    }

    pub fn with_features(features: StoreFeatures) -> Self {
        Self {
            features,
            tables: IndexTable::iter().map(|t| (t, SkipSet::new())).collect(),
            commit_lock: Mutex::new(()),
        }
    }

    /// Number of `(field values, element id)` pairs stored in `table`.
    pub fn len(&self, table: IndexTable) -> usize {
        self.tables.get(&table).map_or(0, SkipSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(SkipSet::is_empty)
    }

    /// Returns `true` if `table` holds the exact `(index label, field values, element id)` row.
    pub fn contains(
        &self,
        table: IndexTable,
        index_label: IndexLabelId,
        field_values: &str,
        element_id: &Id,
    ) -> bool {
        let row = IndexRow {
            index_label,
            field_values: field_values.to_string(),
            element_id: element_id.clone(),
        };
        self.tables.get(&table).is_some_and(|t| t.contains(&row))
    }

    fn table(&self, table: IndexTable) -> StorageResult<&SkipSet<IndexRow>> {
        self.tables
            .get(&table)
            .ok_or_else(|| StorageError::Backend(format!("table {table} does not exist")))
    }

    fn scan_bounds(
        query: &ConditionQuery,
        index_label: IndexLabelId,
    ) -> StorageResult<(IndexRow, Bound<IndexRow>)> {
        let mut lower: Option<(String, bool)> = None;
        let mut upper: Option<(String, bool)> = None;
        for relation in query.relations() {
            if relation.key() != ConditionKey::Sys(SysKey::FieldValues) {
                continue;
            }
            let value = relation
                .value()
                .as_scalar()
                .and_then(|v| v.as_text())
                .ok_or_else(|| {
                    StorageError::UnsupportedQuery(format!("non-text field values in {relation}"))
                })?
                .to_string();
            match relation.relation() {
                RelationType::Eq => {
                    tighten_lower(&mut lower, value.clone(), true);
                    tighten_upper(&mut upper, value, true);
                }
                RelationType::Gt => tighten_lower(&mut lower, value, false),
                RelationType::Gte => tighten_lower(&mut lower, value, true),
                RelationType::Lt => tighten_upper(&mut upper, value, false),
                RelationType::Lte => tighten_upper(&mut upper, value, true),
                _ => {
                    return Err(StorageError::UnsupportedQuery(format!(
                        "relation {relation} on field values"
                    )));
                }
            }
        }

        let lower = match lower {
            None => IndexRow::first_of(index_label, String::new()),
            Some((v, true)) => IndexRow::first_of(index_label, v),
            Some((mut v, false)) => {
                v.push('\0');
                IndexRow::first_of(index_label, v)
            }
        };
        let upper = match upper {
            None => Bound::Unbounded,
            Some((mut v, true)) => {
                v.push('\0');
                Bound::Excluded(IndexRow::first_of(index_label, v))
            }
            Some((v, false)) => Bound::Excluded(IndexRow::first_of(index_label, v)),
        };
        Ok((lower, upper))
    }
}

fn tighten_lower(bound: &mut Option<(String, bool)>, value: String, inclusive: bool) {
    let tighter = match bound {
        None => true,
        Some((current, current_inclusive)) => {
            value > *current || (value == *current && *current_inclusive && !inclusive)
        }
    };
    if tighter {
        *bound = Some((value, inclusive));
    }
}

fn tighten_upper(bound: &mut Option<(String, bool)>, value: String, inclusive: bool) {
    let tighter = match bound {
        None => true,
        Some((current, current_inclusive)) => {
            value < *current || (value == *current && *current_inclusive && !inclusive)
        }
    };
    if tighter {
        *bound = Some((value, inclusive));
    }
}

fn encode_page(row: &IndexRow) -> StorageResult<String> {
    let bytes =
        postcard::to_allocvec(row).map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_page(page: &str) -> StorageResult<IndexRow> {
    let bytes = URL_SAFE_NO_PAD
        .decode(page)
        .map_err(|e| StorageError::InvalidPage(e.to_string()))?;
    postcard::from_bytes(&bytes).map_err(|e| StorageError::InvalidPage(e.to_string()))
}

impl BackendStore for MemoryStore {
    #[inline]
    fn features(&self) -> StoreFeatures {
        self.features
    }

    fn query(&self, query: &ConditionQuery) -> StorageResult<EntryIteratorRef> {
        let table = query.result_type().index_table().ok_or_else(|| {
            StorageError::UnsupportedQuery(format!("not an index query: {query}"))
        })?;
        let index_label = query.condition_index_label().ok_or_else(|| {
            StorageError::UnsupportedQuery(format!("index label is required: {query}"))
        })?;
        let rows = self.table(table)?;
        let (mut lower, upper) = Self::scan_bounds(query, index_label)?;
        if let Some(page) = query.page().filter(|p| !p.is_empty()) {
            let resume = decode_page(page)?;
            if resume.index_label != index_label {
                return Err(StorageError::InvalidPage(format!(
                    "page of index label {} used for {index_label}",
                    resume.index_label
                )));
            }
            lower = lower.max(resume);
        }
        let empty = match &upper {
            Bound::Excluded(upper) => *upper <= lower,
            _ => false,
        };
        if empty {
            let paging = self.features.supports_paging;
            return Ok(Box::new(MemoryEntryIter::new(table, Vec::new(), None, paging)));
        }

        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
        let mut scan = rows
            .range((Bound::Included(lower), upper))
            .map(|e| e.value().clone())
            .take_while(|row| row.index_label == index_label);
        let selected: Vec<IndexRow> = scan.by_ref().take(limit).collect();
        if !self.features.supports_paging {
            return Ok(Box::new(MemoryEntryIter::new(table, selected, None, false)));
        }
        let next_page = scan.next().map(|row| encode_page(&row)).transpose()?;
        Ok(Box::new(MemoryEntryIter::new(table, selected, next_page, true)))
    }

    fn mutate(&self, mutation: &BackendMutation) -> StorageResult<()> {
        let _guard = self.commit_lock.lock();
        for item in mutation.items() {
            let entry = &item.entry;
            let rows = self.table(entry.table())?;
            match item.action {
                Action::Append => {
                    for id in entry.element_ids() {
                        rows.insert(IndexRow {
                            index_label: entry.index_label(),
                            field_values: entry.field_values().to_string(),
                            element_id: id.clone(),
                        });
                    }
                }
                Action::Eliminate => {
                    for id in entry.element_ids() {
                        rows.remove(&IndexRow {
                            index_label: entry.index_label(),
                            field_values: entry.field_values().to_string(),
                            element_id: id.clone(),
                        });
                    }
                }
                Action::Remove => {
                    let start = IndexRow::first_of(entry.index_label(), String::new());
                    let doomed: Vec<IndexRow> = rows
                        .range(start..)
                        .map(|e| e.value().clone())
                        .take_while(|row| row.index_label == entry.index_label())
                        .collect();
                    for row in &doomed {
                        rows.remove(row);
                    }
                }
            }
        }
        Ok(())
    }
}

struct MemoryEntryIter {
    table: IndexTable,
    rows: std::vec::IntoIter<IndexRow>,
    next_page: Option<String>,
    paging: bool,
}

impl MemoryEntryIter {
    fn new(
        table: IndexTable,
        rows: Vec<IndexRow>,
        next_page: Option<String>,
        paging: bool,
    ) -> Self {
        Self {
            table,
            rows: rows.into_iter(),
            next_page,
            paging,
        }
    }
}

impl Iterator for MemoryEntryIter {
    type Item = StorageResult<BackendEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| {
            Ok(BackendEntry::new(
                self.table,
                row.index_label,
                row.field_values,
                vec![row.element_id],
            ))
        })
    }
}

impl PageMetadata for MemoryEntryIter {
    fn next_page(&self) -> Option<String> {
        match self.rows.as_slice().first() {
            // The caller stopped early, resume from the first row it did not consume.
            Some(row) => encode_page(row).ok(),
            None => self.next_page.clone(),
        }
    }
}

impl EntryIterator for MemoryEntryIter {
    fn page_metadata(&self) -> Option<&dyn PageMetadata> {
        if self.paging { Some(self) } else { None }
    }
}
