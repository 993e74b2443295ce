use serde::Deserialize;

const DEFAULT_REPAIR_THREADS: usize = 2;
const DEFAULT_QUERY_BATCH_SIZE: u64 = 500;
const DEFAULT_FINISHED_JOBS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Worker threads running left index repair jobs
    pub repair_threads: usize,

    /// Number of finished jobs whose status is kept for callers to look up
    pub finished_jobs_capacity: usize,

    /// Page size used when draining a paged id holder
    pub query_batch_size: u64,

    /// Whether condition values are checked against the data type of their property key
    /// before an index is scanned
    pub check_value_types: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            repair_threads: DEFAULT_REPAIR_THREADS,
            finished_jobs_capacity: DEFAULT_FINISHED_JOBS_CAPACITY,
            query_batch_size: DEFAULT_QUERY_BATCH_SIZE,
            check_value_types: true,
        }
    }
}
