use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use graphidx_catalog::index_label::IndexLabel;
use graphidx_catalog::provider::{IndexLabelRef, SchemaRef};
use graphidx_common::id::Id;
use graphidx_storage::model::element::{Element, ElementProviderRef};
use graphidx_storage::query::{ConditionQuery, RelationType};
use graphidx_storage::store::StoreRef;

use crate::analyzer::{AnalyzerRef, WordAnalyzer};
use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::holder::{IdHolder, PageIds, PagedIdHolder};
use crate::id_set::IdSet;
use crate::job::{JobId, JobScheduler, JobStatus};
use crate::lock::{LockGroup, LockManager};
use crate::record::IndexRecord;
use crate::repair::LeftIndexRepairJob;
use crate::transaction::IndexTransaction;

const SCAN_LOCKS: [LockGroup; 2] = [LockGroup::IndexLabelDelete, LockGroup::IndexLabelRebuild];

/// Shared state of the index layer of one graph: the backend, the schema and the services
/// transactions and repair jobs run on.
#[derive(Debug)]
pub struct IndexEngine {
    store: StoreRef,
    schema: SchemaRef,
    elements: ElementProviderRef,
    analyzer: AnalyzerRef,
    locks: LockManager,
    scheduler: JobScheduler,
    config: IndexConfig,
}

impl IndexEngine {
    /// Creates an engine segmenting search text with [`WordAnalyzer`].
    pub fn new(
        store: StoreRef,
        schema: SchemaRef,
        elements: ElementProviderRef,
        config: IndexConfig,
    ) -> IndexResult<Arc<Self>> {
        Self::with_analyzer(store, schema, elements, Arc::new(WordAnalyzer), config)
    }

    pub fn with_analyzer(
        store: StoreRef,
        schema: SchemaRef,
        elements: ElementProviderRef,
        analyzer: AnalyzerRef,
        config: IndexConfig,
    ) -> IndexResult<Arc<Self>> {
        let scheduler = JobScheduler::new(config.repair_threads, config.finished_jobs_capacity)?;
        Ok(Arc::new(Self {
            store,
            schema,
            elements,
            analyzer,
            locks: LockManager::new(),
            scheduler,
            config,
        }))
    }

    #[inline]
    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    #[inline]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    #[inline]
    pub fn elements(&self) -> &ElementProviderRef {
        &self.elements
    }

    #[inline]
    pub fn analyzer(&self) -> &AnalyzerRef {
        &self.analyzer
    }

    #[inline]
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn begin_transaction(self: &Arc<Self>) -> IndexTransaction {
        IndexTransaction::new(self.clone())
    }

    #[inline]
    pub fn segment(&self, text: &str) -> BTreeSet<String> {
        self.analyzer.segment(text)
    }

    /// Whether the words of a stored property value intersect the words of a query text.
    pub fn match_search_index_words(&self, prop_value: &str, field_value: &str) -> bool {
        let words = self.segment(field_value);
        !self.segment(prop_value).is_disjoint(&words)
    }

    /// Scans the entries of one index query once, collecting the element ids in scan order.
    ///
    /// The scan holds the delete and rebuild read locks of the index label and stops as soon
    /// as the query limit is reached. In paging mode the token of the following page is taken
    /// from the entry iterator.
    pub fn scan_index(
        &self,
        index_label: &IndexLabel,
        query: &ConditionQuery,
    ) -> IndexResult<PageIds> {
        self.locks.with_read_locks(index_label.id(), &SCAN_LOCKS, || {
            let mut entries = self.store.query(query)?;
            let mut ids = IdSet::new();
            for entry in entries.by_ref() {
                let record = IndexRecord::from_entry(index_label, entry?)?;
                ids.extend(record.into_element_ids());
                if query.reach_limit(ids.len() as u64) {
                    break;
                }
            }
            if ids.is_empty() {
                return Ok(PageIds::empty());
            }
            if !query.paging() {
                return Ok(PageIds::new(ids, None));
            }
            let metadata = entries.page_metadata().ok_or_else(|| {
                IndexError::InvariantViolation(format!(
                    "entries of '{}' must expose page metadata when query in paging",
                    index_label.name()
                ))
            })?;
            Ok(PageIds::new(ids, metadata.next_page()))
        })
    }

    /// Runs an index query eagerly, or wraps it in a lazily paged holder if it is paging.
    pub fn do_index_query(
        self: &Arc<Self>,
        index_label: IndexLabelRef,
        query: ConditionQuery,
    ) -> IndexResult<IdHolder> {
        if !query.paging() {
            let (ids, _) = self.scan_index(&index_label, &query)?.into_parts();
            return Ok(IdHolder::Batch(ids));
        }
        let engine = self.clone();
        Ok(IdHolder::Paged(PagedIdHolder::new(
            query,
            Box::new(move |q| engine.scan_index(&index_label, q)),
        )))
    }

    /// Returns `true` if the store holds `element_id` under `field_values` of `index_label`.
    pub fn index_entry_exists(
        &self,
        index_label: &IndexLabel,
        field_values: &str,
        element_id: &Id,
    ) -> IndexResult<bool> {
        let query = ConditionQuery::index(index_label.table(), index_label.id())
            .with_field_values(RelationType::Eq, field_values);
        Ok(self.scan_index(index_label, &query)?.ids().contains(element_id))
    }

    /// The latest committed state of `element`, `None` if it was deleted.
    pub fn newest_element(&self, element: &Element) -> IndexResult<Option<Element>> {
        Ok(self
            .elements
            .element(element.element_type(), element.id())?)
    }

    /// Schedules a job removing the entries that index `element` under values it no longer
    /// carries. The job runs in its own transaction; its outcome is only visible through
    /// [`IndexEngine::job_status`].
    pub fn schedule_left_index_repair(
        self: &Arc<Self>,
        query: ConditionQuery,
        element: Element,
    ) -> JobId {
        let engine = self.clone();
        let name = format!("remove_left_index:{}", element.id());
        self.scheduler
            .schedule(name, move || LeftIndexRepairJob::new(engine, query, element).run())
    }

    #[inline]
    pub fn job_status(&self, id: JobId) -> Option<JobStatus> {
        self.scheduler.status(id)
    }

    /// Blocks until the job finishes or `timeout` elapses.
    #[inline]
    pub fn wait_for_job(&self, id: JobId, timeout: Duration) -> Option<JobStatus> {
        self.scheduler.wait(id, timeout)
    }
}
