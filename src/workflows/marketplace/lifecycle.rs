use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::domain::{Bid, BidId, BidStatus, Job, JobDraft, JobId, JobStatus};
use super::errors::MarketplaceError;
use super::store::{MarketplaceStore, StoreError};

/// Days an OPEN job may sit without an accepted bid before the maintenance
/// sweep expires it.
pub const DEFAULT_EXPIRY_DAYS: i64 = 30;

const SWEEP_RETRY_ATTEMPTS: usize = 3;

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

/// Owns the authoritative state machine for job postings.
pub struct JobLifecycle<S> {
    store: Arc<S>,
    expiry_days: i64,
}

impl<S: MarketplaceStore> JobLifecycle<S> {
    pub fn new(store: Arc<S>, expiry_days: i64) -> Self {
        Self { store, expiry_days }
    }

    /// Creates a job in OPEN with a zeroed bid counter.
    pub fn open(&self, buyer_id: &str, draft: JobDraft) -> Result<Job, MarketplaceError> {
        validate_draft(&draft)?;

        let now = Utc::now();
        let job = Job {
            job_id: next_job_id(),
            buyer_id: buyer_id.to_string(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            skills: draft.skills,
            location: draft.location,
            budget: draft.budget,
            timeline: draft.timeline,
            status: JobStatus::Open,
            bid_count: 0,
            accepted_bid_id: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_job(&job).map_err(|err| match err {
            StoreError::Conflict => MarketplaceError::Conflict("job id already exists".to_string()),
            other => other.into(),
        })?;
        Ok(job)
    }

    /// Awards the job to one pending bid. Phase 1 conditionally transitions
    /// the job so concurrent accepts yield exactly one winner; phase 2 is
    /// [`Self::settle_bids`]. Once phase 1 commits the award stands: a bid
    /// update lost to a concurrent writer rolls forward instead of failing
    /// the acceptance.
    pub fn accept_bid(&self, job_id: &JobId, bid_id: &BidId) -> Result<Job, MarketplaceError> {
        let mut job = self
            .store
            .fetch_job(job_id)?
            .ok_or(MarketplaceError::NotFound("job"))?;
        if job.status != JobStatus::Open {
            return Err(MarketplaceError::InvalidState(
                "job is no longer accepting bids".to_string(),
            ));
        }

        let bid = self
            .store
            .fetch_bid(job_id, bid_id)?
            .ok_or(MarketplaceError::NotFound("bid"))?;
        if bid.status != BidStatus::Pending {
            return Err(MarketplaceError::Conflict(
                "bid is no longer pending".to_string(),
            ));
        }

        job.status = JobStatus::InProgress;
        job.accepted_bid_id = Some(bid_id.clone());
        job.updated_at = Utc::now();
        self.store
            .update_job(&job, JobStatus::Open)
            .map_err(|err| match err {
                StoreError::Conflict => MarketplaceError::InvalidState(
                    "job was awarded or closed concurrently".to_string(),
                ),
                other => other.into(),
            })?;

        self.settle_bids(job_id, bid_id)?;
        Ok(job)
    }

    /// Settlement sweep for an awarded job: promotes the winning bid to
    /// ACCEPTED and sweeps every other PENDING bid to REJECTED. Idempotent
    /// and keyed only by the job and winning bid, so a caller can re-run it
    /// to resume after a partial failure.
    pub fn settle_bids(&self, job_id: &JobId, accepted: &BidId) -> Result<(), MarketplaceError> {
        for bid in self.store.bids_for_job(job_id)? {
            if bid.bid_id == *accepted {
                self.promote_winner(bid)?;
                continue;
            }
            if bid.status != BidStatus::Pending {
                continue;
            }
            let mut loser = bid;
            loser.status = BidStatus::Rejected;
            loser.updated_at = Utc::now();
            match self.update_bid_with_retry(&loser, BidStatus::Pending) {
                Ok(()) => {}
                // The bid moved under us (e.g. a withdrawal landed first);
                // the sweep's job for this bid is done either way.
                Err(MarketplaceError::Conflict(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// The award stands once the job committed, so the winner is promoted
    /// from whatever state settlement finds it in; a withdrawal that raced
    /// the acceptance into the settlement gap loses to it.
    fn promote_winner(&self, bid: Bid) -> Result<(), MarketplaceError> {
        let mut current = bid;
        let mut attempt = 0;
        loop {
            if current.status == BidStatus::Accepted {
                return Ok(());
            }
            let mut winner = current.clone();
            winner.status = BidStatus::Accepted;
            winner.updated_at = Utc::now();
            match self.update_bid_with_retry(&winner, current.status) {
                Ok(()) => return Ok(()),
                Err(MarketplaceError::Conflict(_)) if attempt + 1 < SWEEP_RETRY_ATTEMPTS => {
                    attempt += 1;
                    current = self
                        .store
                        .fetch_bid(&winner.job_id, &winner.bid_id)?
                        .ok_or(MarketplaceError::NotFound("bid"))?;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Cancels an OPEN job.
    pub fn cancel(&self, job_id: &JobId, reason: &str) -> Result<Job, MarketplaceError> {
        let mut job = self
            .store
            .fetch_job(job_id)?
            .ok_or(MarketplaceError::NotFound("job"))?;
        if job.status != JobStatus::Open {
            return Err(MarketplaceError::InvalidState(
                "only open jobs can be cancelled".to_string(),
            ));
        }

        job.status = JobStatus::Cancelled;
        job.cancel_reason = Some(reason.to_string());
        job.updated_at = Utc::now();
        self.store
            .update_job(&job, JobStatus::Open)
            .map_err(|err| match err {
                StoreError::Conflict => {
                    MarketplaceError::InvalidState("job state changed concurrently".to_string())
                }
                other => other.into(),
            })?;
        Ok(job)
    }

    /// Marks an IN_PROGRESS job as done.
    pub fn complete(&self, job_id: &JobId) -> Result<Job, MarketplaceError> {
        let mut job = self
            .store
            .fetch_job(job_id)?
            .ok_or(MarketplaceError::NotFound("job"))?;
        if job.status != JobStatus::InProgress {
            return Err(MarketplaceError::InvalidState(
                "only in-progress jobs can be completed".to_string(),
            ));
        }

        job.status = JobStatus::Completed;
        job.updated_at = Utc::now();
        self.store
            .update_job(&job, JobStatus::InProgress)
            .map_err(|err| match err {
                StoreError::Conflict => {
                    MarketplaceError::InvalidState("job state changed concurrently".to_string())
                }
                other => other.into(),
            })?;
        Ok(job)
    }

    /// System-triggered expiry of one job. A no-op (not an error) unless
    /// the job is OPEN and older than the expiry threshold.
    pub fn expire(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<bool, MarketplaceError> {
        let Some(mut job) = self.store.fetch_job(job_id)? else {
            return Ok(false);
        };
        let cutoff = now - Duration::days(self.expiry_days);
        if job.status != JobStatus::Open || job.created_at > cutoff {
            return Ok(false);
        }

        job.status = JobStatus::Expired;
        job.updated_at = now;
        match self.store.update_job(&job, JobStatus::Open) {
            Ok(()) => Ok(true),
            // Lost to a concurrent transition; the job no longer qualifies.
            Err(StoreError::Conflict) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    /// Scheduler entry point: expires every stale OPEN job and reports how
    /// many were transitioned.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize, MarketplaceError> {
        let mut expired = 0;
        for job in self.store.jobs_with_status(JobStatus::Open)? {
            if self.expire(&job.job_id, now)? {
                expired += 1;
            }
        }
        Ok(expired)
    }

    fn update_bid_with_retry(
        &self,
        bid: &Bid,
        expected: BidStatus,
    ) -> Result<(), MarketplaceError> {
        let mut attempt = 0;
        loop {
            match self.store.update_bid(bid, expected) {
                Ok(()) => return Ok(()),
                Err(StoreError::Unavailable(detail)) if attempt + 1 < SWEEP_RETRY_ATTEMPTS => {
                    attempt += 1;
                    warn!(%detail, attempt, bid_id = %bid.bid_id.0, "retrying bid status update");
                }
                Err(StoreError::Conflict) => {
                    return Err(MarketplaceError::Conflict(
                        "bid changed concurrently".to_string(),
                    ))
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}

fn validate_draft(draft: &JobDraft) -> Result<(), MarketplaceError> {
    fn required(field: &'static str, value: &str) -> Result<(), MarketplaceError> {
        if value.trim().is_empty() {
            return Err(MarketplaceError::Validation(format!("{field} is required")));
        }
        Ok(())
    }

    required("title", &draft.title)?;
    required("description", &draft.description)?;
    required("category", &draft.category)?;
    required("location", &draft.location)?;
    required("timeline", &draft.timeline)?;

    if draft.skills.iter().all(|skill| skill.trim().is_empty()) {
        return Err(MarketplaceError::Validation(
            "at least one skill is required".to_string(),
        ));
    }

    let budget = &draft.budget;
    if !budget.min.is_finite() || !budget.max.is_finite() || budget.min < 0.0 || budget.max < 0.0 {
        return Err(MarketplaceError::Validation(
            "budget bounds must be non-negative numbers".to_string(),
        ));
    }
    if budget.min > budget.max {
        return Err(MarketplaceError::Validation(
            "budget.min must not exceed budget.max".to_string(),
        ));
    }
    required("budget.currency", &budget.currency)?;

    Ok(())
}
