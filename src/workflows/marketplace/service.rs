use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::bids::BidWorkflow;
use super::domain::{BidId, BidRequest, BidSummary, Job, JobDraft, JobId, WorkerId, WorkerProfile};
use super::errors::MarketplaceError;
use super::lifecycle::{JobLifecycle, DEFAULT_EXPIRY_DAYS};
use super::matching::{MatchResult, MatchingConfig, MatchingEngine};
use super::notify::{MarketplaceEvent, Notifier};
use super::risk::{self, DelayRiskAssessment, DelayRiskFeatures};
use super::store::{MarketplaceStore, WorkerDirectory};

/// Façade composing the lifecycle manager, bid workflow, matcher, and
/// delay-risk estimator behind the operations the API layer calls.
pub struct MarketplaceService<S, D, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    lifecycle: JobLifecycle<S>,
    bids: BidWorkflow<S, D, N>,
    matcher: MatchingEngine,
}

impl<S, D, N> MarketplaceService<S, D, N>
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, notifier: Arc<N>) -> Self {
        Self::with_config(
            store,
            directory,
            notifier,
            MatchingConfig::default(),
            DEFAULT_EXPIRY_DAYS,
        )
    }

    pub fn with_config(
        store: Arc<S>,
        directory: Arc<D>,
        notifier: Arc<N>,
        matching: MatchingConfig,
        expiry_days: i64,
    ) -> Self {
        Self {
            lifecycle: JobLifecycle::new(store.clone(), expiry_days),
            bids: BidWorkflow::new(store.clone(), directory, notifier.clone()),
            matcher: MatchingEngine::new(matching),
            store,
            notifier,
        }
    }

    pub fn create_job(&self, buyer_id: &str, draft: JobDraft) -> Result<Job, MarketplaceError> {
        self.lifecycle.open(buyer_id, draft)
    }

    pub fn job(&self, job_id: &JobId) -> Result<Job, MarketplaceError> {
        self.store
            .fetch_job(job_id)?
            .ok_or(MarketplaceError::NotFound("job"))
    }

    pub fn submit_bid(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
        request: BidRequest,
    ) -> Result<BidSummary, MarketplaceError> {
        self.bids.submit(job_id, worker_id, request)
    }

    pub fn withdraw_bid(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
    ) -> Result<BidSummary, MarketplaceError> {
        self.bids.withdraw(job_id, worker_id)
    }

    /// Buyer-only: awards the job to one bid and notifies the winner.
    pub fn accept_bid(
        &self,
        buyer_id: &str,
        job_id: &JobId,
        bid_id: &BidId,
    ) -> Result<Job, MarketplaceError> {
        let job = self.job(job_id)?;
        if job.buyer_id != buyer_id {
            return Err(MarketplaceError::Forbidden(
                "only the job owner may accept a bid".to_string(),
            ));
        }

        let awarded = self.lifecycle.accept_bid(job_id, bid_id)?;

        // Best-effort event; the award already stands.
        if let Ok(Some(bid)) = self.store.fetch_bid(job_id, bid_id) {
            self.publish(MarketplaceEvent::BidAccepted {
                job_id: job_id.clone(),
                bid_id: bid_id.clone(),
                worker_id: bid.worker_id,
                buyer_id: awarded.buyer_id.clone(),
            });
        }
        Ok(awarded)
    }

    /// Buyer-only: cancels an open job.
    pub fn cancel_job(
        &self,
        buyer_id: &str,
        job_id: &JobId,
        reason: &str,
    ) -> Result<Job, MarketplaceError> {
        let job = self.job(job_id)?;
        if job.buyer_id != buyer_id {
            return Err(MarketplaceError::Forbidden(
                "only the job owner may cancel it".to_string(),
            ));
        }

        let cancelled = self.lifecycle.cancel(job_id, reason)?;
        self.publish(MarketplaceEvent::JobCancelled {
            job_id: job_id.clone(),
            buyer_id: cancelled.buyer_id.clone(),
            reason: reason.to_string(),
        });
        Ok(cancelled)
    }

    pub fn complete_job(&self, job_id: &JobId) -> Result<Job, MarketplaceError> {
        self.lifecycle.complete(job_id)
    }

    /// Scheduler entry point; returns how many jobs were expired.
    pub fn expire_stale_jobs(&self, now: DateTime<Utc>) -> Result<usize, MarketplaceError> {
        self.lifecycle.expire_stale(now)
    }

    /// Ranks a caller-supplied candidate pool against the job. An empty
    /// pool yields an empty ranking, not an error.
    pub fn match_workers(
        &self,
        job_id: &JobId,
        candidates: &[WorkerProfile],
    ) -> Result<Vec<MatchResult>, MarketplaceError> {
        let job = self.job(job_id)?;
        Ok(self.matcher.rank(&job, candidates))
    }

    /// Advisory only; the assessment never gates a transition.
    pub fn estimate_delay_risk(
        &self,
        job_id: &JobId,
        features: DelayRiskFeatures,
    ) -> Result<DelayRiskAssessment, MarketplaceError> {
        self.job(job_id)?;
        Ok(risk::estimate(features))
    }

    fn publish(&self, event: MarketplaceEvent) {
        if let Err(err) = self.notifier.publish(&event) {
            warn!(topic = event.topic(), error = %err, "notification dropped");
        }
    }
}
