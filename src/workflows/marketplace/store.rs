use super::domain::{Bid, BidId, BidStatus, Job, JobId, JobStatus, WorkerId, WorkerProfile};

/// Composite key addressing an item in the single-table layout: job metadata
/// lives at `(JOB#<id>, META)`, bids at `(JOB#<id>, BID#<worker>)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn job(id: &JobId) -> Self {
        Self {
            partition: format!("JOB#{}", id.0),
            sort: "META".to_string(),
        }
    }

    pub fn bid(job: &JobId, worker: &WorkerId) -> Self {
        Self {
            partition: format!("JOB#{}", job.0),
            sort: format!("BID#{}", worker.0),
        }
    }
}

/// Error enumeration for store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conditional write failed")]
    Conflict,
    #[error("item not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the marketplace table. Every mutating method
/// carries its concurrency contract in the signature: inserts are
/// create-if-absent, updates are conditional on the caller's expected status,
/// and the bid counter moves by server-side atomic increment.
pub trait MarketplaceStore: Send + Sync {
    /// Create-if-absent on the job key.
    fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;

    /// Replaces the stored job only while its current status equals
    /// `expected`; otherwise fails with [`StoreError::Conflict`].
    fn update_job(&self, job: &Job, expected: JobStatus) -> Result<(), StoreError>;

    fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;

    /// Create-if-absent on the composite (job, worker) key. Two racing
    /// submissions from the same worker yield exactly one success.
    fn insert_bid(&self, bid: &Bid) -> Result<(), StoreError>;

    fn fetch_bid(&self, job_id: &JobId, bid_id: &BidId) -> Result<Option<Bid>, StoreError>;

    /// All bids under the job partition, in stable key order.
    fn bids_for_job(&self, job_id: &JobId) -> Result<Vec<Bid>, StoreError>;

    /// Replaces the stored bid only while its current status equals
    /// `expected`.
    fn update_bid(&self, bid: &Bid, expected: BidStatus) -> Result<(), StoreError>;

    /// Atomic numeric increment of the job's bid counter, clamped at zero.
    /// Returns the new count.
    fn increment_bid_count(&self, job_id: &JobId, delta: i64) -> Result<u32, StoreError>;
}

/// Read-only lookup into the external profile collaborator.
pub trait WorkerDirectory: Send + Sync {
    fn profile(&self, worker_id: &WorkerId) -> Result<Option<WorkerProfile>, StoreError>;
}
