use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{Bid, BidId, BidRequest, BidStatus, BidSummary, JobId, WorkerId};
use super::errors::MarketplaceError;
use super::notify::{MarketplaceEvent, Notifier};
use super::store::{MarketplaceStore, StoreError, WorkerDirectory};

// The counter moves after the bid row is written. If every attempt fails
// the submission surfaces the transient error with the bid already
// persisted, and the stored counter lags the authoritative bid rows.
const COUNTER_RETRY_ATTEMPTS: usize = 3;

static BID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_bid_id() -> BidId {
    let id = BID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BidId(format!("bid-{id:06}"))
}

/// Validates and records worker bids against a job, enforcing the
/// one-bid-per-worker rule and triggering downstream notification.
pub struct BidWorkflow<S, D, N> {
    store: Arc<S>,
    directory: Arc<D>,
    notifier: Arc<N>,
}

impl<S, D, N> BidWorkflow<S, D, N>
where
    S: MarketplaceStore,
    D: WorkerDirectory,
    N: Notifier,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    /// Submits a bid. Preconditions short-circuit in order: worker
    /// verification, job existence, job open, then the create-if-absent
    /// insert which doubles as the duplicate-bid check.
    pub fn submit(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
        request: BidRequest,
    ) -> Result<BidSummary, MarketplaceError> {
        validate_request(&request)?;

        let profile = self
            .directory
            .profile(worker_id)?
            .filter(|profile| profile.fully_verified())
            .ok_or_else(|| {
                MarketplaceError::Forbidden(
                    "worker must complete identity verification before bidding".to_string(),
                )
            })?;

        let job = self
            .store
            .fetch_job(job_id)?
            .ok_or(MarketplaceError::NotFound("job"))?;
        if !job.status.accepts_bids() {
            return Err(MarketplaceError::InvalidState(
                "job is no longer accepting bids".to_string(),
            ));
        }

        let now = Utc::now();
        let bid = Bid {
            bid_id: next_bid_id(),
            job_id: job_id.clone(),
            worker_id: worker_id.clone(),
            quote: request.quote,
            currency: request.currency,
            timeline: request.timeline,
            proposal: request.proposal,
            status: BidStatus::Pending,
            trust_score_snapshot: profile.trust_score,
            completion_rate_snapshot: profile.completion_rate,
            created_at: now,
            updated_at: now,
        };

        // No read-then-write existence check: the conditional insert on the
        // composite key is the uniqueness guarantee.
        self.store.insert_bid(&bid).map_err(|err| match err {
            StoreError::Conflict => {
                MarketplaceError::Conflict("worker has already bid on this job".to_string())
            }
            other => other.into(),
        })?;

        self.increment_with_retry(job_id, 1)?;

        self.publish(MarketplaceEvent::BidReceived {
            job_id: job_id.clone(),
            bid_id: bid.bid_id.clone(),
            worker_id: worker_id.clone(),
            worker_name: profile.display_name.clone(),
            quote: bid.quote,
            buyer_id: job.buyer_id.clone(),
        });

        Ok(bid.summary())
    }

    /// Withdraws the caller's own pending bid while the job is still open.
    /// The composite key stays occupied, so a withdrawn worker cannot
    /// re-bid on the same job. A withdrawal that races an acceptance can
    /// lose to it: settlement promotes the winning bid regardless.
    pub fn withdraw(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
    ) -> Result<BidSummary, MarketplaceError> {
        let job = self
            .store
            .fetch_job(job_id)?
            .ok_or(MarketplaceError::NotFound("job"))?;
        if !job.status.accepts_bids() {
            return Err(MarketplaceError::InvalidState(
                "bids can only be withdrawn while the job is open".to_string(),
            ));
        }

        let bid = self
            .store
            .bids_for_job(job_id)?
            .into_iter()
            .find(|bid| bid.worker_id == *worker_id)
            .ok_or(MarketplaceError::NotFound("bid"))?;
        if bid.status != BidStatus::Pending {
            return Err(MarketplaceError::InvalidState(
                "only pending bids can be withdrawn".to_string(),
            ));
        }

        let mut withdrawn = bid;
        withdrawn.status = BidStatus::Withdrawn;
        withdrawn.updated_at = Utc::now();
        self.store
            .update_bid(&withdrawn, BidStatus::Pending)
            .map_err(|err| match err {
                StoreError::Conflict => {
                    MarketplaceError::Conflict("bid changed concurrently".to_string())
                }
                other => other.into(),
            })?;

        self.increment_with_retry(job_id, -1)?;
        Ok(withdrawn.summary())
    }

    fn increment_with_retry(&self, job_id: &JobId, delta: i64) -> Result<(), MarketplaceError> {
        let mut attempt = 0;
        loop {
            match self.store.increment_bid_count(job_id, delta) {
                Ok(_) => return Ok(()),
                Err(StoreError::Unavailable(detail)) if attempt + 1 < COUNTER_RETRY_ATTEMPTS => {
                    attempt += 1;
                    warn!(%detail, attempt, job_id = %job_id.0, "retrying bid counter update");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Fire-and-forget: a failed publish is logged and swallowed, never
    /// surfaced as a workflow failure.
    fn publish(&self, event: MarketplaceEvent) {
        if let Err(err) = self.notifier.publish(&event) {
            warn!(topic = event.topic(), error = %err, "notification dropped");
        }
    }
}

fn validate_request(request: &BidRequest) -> Result<(), MarketplaceError> {
    if !request.quote.is_finite() || request.quote <= 0.0 {
        return Err(MarketplaceError::Validation(
            "quote must be a positive amount".to_string(),
        ));
    }
    if request.currency.trim().is_empty() {
        return Err(MarketplaceError::Validation(
            "currency is required".to_string(),
        ));
    }
    if request.timeline.trim().is_empty() {
        return Err(MarketplaceError::Validation(
            "timeline is required".to_string(),
        ));
    }
    Ok(())
}
