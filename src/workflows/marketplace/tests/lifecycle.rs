use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::common::*;
use crate::workflows::marketplace::domain::{Bid, BidId, BidStatus, Job, JobId, JobStatus};
use crate::workflows::marketplace::errors::MarketplaceError;
use crate::workflows::marketplace::lifecycle::{JobLifecycle, DEFAULT_EXPIRY_DAYS};
use crate::workflows::marketplace::memory::MemoryStore;
use crate::workflows::marketplace::notify::MarketplaceEvent;
use crate::workflows::marketplace::store::{MarketplaceStore, StoreError};

/// Store wrapper that slips a withdrawal of the winning bid in right
/// behind the award commit, reproducing a withdraw racing an accept.
struct WithdrawingStore {
    inner: Arc<MemoryStore>,
    fired: AtomicBool,
}

impl MarketplaceStore for WithdrawingStore {
    fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        self.inner.insert_job(job)
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        self.inner.fetch_job(id)
    }

    fn update_job(&self, job: &Job, expected: JobStatus) -> Result<(), StoreError> {
        self.inner.update_job(job, expected)?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            if let Some(winner) = job.accepted_bid_id.as_ref() {
                if let Some(bid) = self.inner.fetch_bid(&job.job_id, winner)? {
                    let mut withdrawn = bid;
                    withdrawn.status = BidStatus::Withdrawn;
                    self.inner.update_bid(&withdrawn, BidStatus::Pending)?;
                }
            }
        }
        Ok(())
    }

    fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        self.inner.jobs_with_status(status)
    }

    fn insert_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        self.inner.insert_bid(bid)
    }

    fn fetch_bid(&self, job_id: &JobId, bid_id: &BidId) -> Result<Option<Bid>, StoreError> {
        self.inner.fetch_bid(job_id, bid_id)
    }

    fn bids_for_job(&self, job_id: &JobId) -> Result<Vec<Bid>, StoreError> {
        self.inner.bids_for_job(job_id)
    }

    fn update_bid(&self, bid: &Bid, expected: BidStatus) -> Result<(), StoreError> {
        self.inner.update_bid(bid, expected)
    }

    fn increment_bid_count(&self, job_id: &JobId, delta: i64) -> Result<u32, StoreError> {
        self.inner.increment_bid_count(job_id, delta)
    }
}

#[test]
fn create_job_opens_with_zeroed_counters() {
    let (service, _, _, _) = build_service();

    let job = service.create_job("buyer-1", draft()).expect("job opens");

    assert_eq!(job.status, JobStatus::Open);
    assert_eq!(job.bid_count, 0);
    assert!(job.accepted_bid_id.is_none());
    assert_eq!(job.buyer_id, "buyer-1");
}

#[test]
fn create_job_rejects_missing_fields() {
    let (service, _, _, _) = build_service();

    let mut missing_title = draft();
    missing_title.title = "  ".to_string();
    assert!(matches!(
        service.create_job("buyer-1", missing_title),
        Err(MarketplaceError::Validation(_))
    ));

    let mut no_skills = draft();
    no_skills.skills.clear();
    assert!(matches!(
        service.create_job("buyer-1", no_skills),
        Err(MarketplaceError::Validation(_))
    ));
}

#[test]
fn create_job_rejects_bad_budgets() {
    let (service, _, _, _) = build_service();

    let mut negative = draft();
    negative.budget.min = -50.0;
    assert!(matches!(
        service.create_job("buyer-1", negative),
        Err(MarketplaceError::Validation(_))
    ));

    let mut inverted = draft();
    inverted.budget.min = 6000.0;
    inverted.budget.max = 5000.0;
    assert!(matches!(
        service.create_job("buyer-1", inverted),
        Err(MarketplaceError::Validation(_))
    ));
}

#[test]
fn accept_bid_awards_job_and_rejects_losers() {
    let (service, store, directory, notifier) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    register_worker(&directory, "worker-2");

    let winning = service
        .submit_bid(&job.job_id, &wid("worker-1"), bid_request(2800.0))
        .expect("first bid lands");
    service
        .submit_bid(&job.job_id, &wid("worker-2"), bid_request(3200.0))
        .expect("second bid lands");

    let awarded = service
        .accept_bid("buyer-1", &job.job_id, &winning.bid_id)
        .expect("acceptance succeeds");

    assert_eq!(awarded.status, JobStatus::InProgress);
    assert_eq!(awarded.accepted_bid_id.as_ref(), Some(&winning.bid_id));

    let bids = store.bids_for_job(&job.job_id).expect("bids readable");
    assert_eq!(bids.len(), 2);
    for bid in &bids {
        if bid.bid_id == winning.bid_id {
            assert_eq!(bid.status, BidStatus::Accepted);
        } else {
            assert_eq!(bid.status, BidStatus::Rejected);
        }
    }

    assert!(notifier
        .events()
        .iter()
        .any(|event| matches!(event, MarketplaceEvent::BidAccepted { .. })));
}

#[test]
fn accept_bid_requires_open_job() {
    let (service, _, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");

    let summary = service
        .submit_bid(
            &job.job_id,
            &wid("worker-1"),
            bid_request(2500.0),
        )
        .expect("bid lands");

    service
        .accept_bid("buyer-1", &job.job_id, &summary.bid_id)
        .expect("first accept succeeds");

    assert!(matches!(
        service.accept_bid("buyer-1", &job.job_id, &summary.bid_id),
        Err(MarketplaceError::InvalidState(_))
    ));
}

#[test]
fn accept_bid_requires_owner_and_existing_bid() {
    let (service, _, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");

    let summary = service
        .submit_bid(
            &job.job_id,
            &wid("worker-1"),
            bid_request(2500.0),
        )
        .expect("bid lands");

    assert!(matches!(
        service.accept_bid("buyer-2", &job.job_id, &summary.bid_id),
        Err(MarketplaceError::Forbidden(_))
    ));
    assert!(matches!(
        service.accept_bid("buyer-1", &job.job_id, &BidId("bid-nope".into())),
        Err(MarketplaceError::NotFound("bid"))
    ));
    assert!(matches!(
        service.accept_bid("buyer-1", &JobId("job-nope".into()), &summary.bid_id),
        Err(MarketplaceError::NotFound("job"))
    ));
}

#[test]
fn cancel_applies_only_to_open_jobs() {
    let (service, _, directory, notifier) = build_service();
    let job = open_job(&service, "buyer-1");

    let cancelled = service
        .cancel_job("buyer-1", &job.job_id, "found someone offline")
        .expect("cancel succeeds");
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(
        cancelled.cancel_reason.as_deref(),
        Some("found someone offline")
    );
    assert!(notifier
        .events()
        .iter()
        .any(|event| matches!(event, MarketplaceEvent::JobCancelled { .. })));

    assert!(matches!(
        service.cancel_job("buyer-1", &job.job_id, "again"),
        Err(MarketplaceError::InvalidState(_))
    ));

    let awarded = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    let summary = service
        .submit_bid(
            &awarded.job_id,
            &wid("worker-1"),
            bid_request(2500.0),
        )
        .expect("bid lands");
    service
        .accept_bid("buyer-1", &awarded.job_id, &summary.bid_id)
        .expect("accept succeeds");
    assert!(matches!(
        service.cancel_job("buyer-1", &awarded.job_id, "too late"),
        Err(MarketplaceError::InvalidState(_))
    ));
}

#[test]
fn complete_requires_in_progress() {
    let (service, _, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");

    assert!(matches!(
        service.complete_job(&job.job_id),
        Err(MarketplaceError::InvalidState(_))
    ));

    register_worker(&directory, "worker-1");
    let summary = service
        .submit_bid(
            &job.job_id,
            &wid("worker-1"),
            bid_request(2500.0),
        )
        .expect("bid lands");
    service
        .accept_bid("buyer-1", &job.job_id, &summary.bid_id)
        .expect("accept succeeds");

    let done = service.complete_job(&job.job_id).expect("complete succeeds");
    assert_eq!(done.status, JobStatus::Completed);
}

#[test]
fn expire_sweep_only_touches_stale_open_jobs() {
    let (service, store, directory, _) = build_service();

    let stale = open_job(&service, "buyer-1");
    backdate(&store, &stale, 31);

    let fresh = open_job(&service, "buyer-1");
    backdate(&store, &fresh, 5);

    let awarded = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    let summary = service
        .submit_bid(
            &awarded.job_id,
            &wid("worker-1"),
            bid_request(2500.0),
        )
        .expect("bid lands");
    service
        .accept_bid("buyer-1", &awarded.job_id, &summary.bid_id)
        .expect("accept succeeds");
    backdate(&store, &awarded, 40);

    let expired = service
        .expire_stale_jobs(Utc::now())
        .expect("sweep succeeds");
    assert_eq!(expired, 1);

    assert_eq!(service.job(&stale.job_id).unwrap().status, JobStatus::Expired);
    assert_eq!(service.job(&fresh.job_id).unwrap().status, JobStatus::Open);
    assert_eq!(
        service.job(&awarded.job_id).unwrap().status,
        JobStatus::InProgress
    );

    // Re-running the sweep finds nothing left to expire.
    assert_eq!(service.expire_stale_jobs(Utc::now()).unwrap(), 0);
}

#[test]
fn expire_is_a_noop_for_non_eligible_jobs() {
    let (_, store, _, _) = build_service();
    let store = Arc::clone(&store);
    let lifecycle = JobLifecycle::new(store.clone(), DEFAULT_EXPIRY_DAYS);

    // Unknown job: no-op, not an error.
    assert!(!lifecycle
        .expire(&JobId("job-missing".into()), Utc::now())
        .expect("expire tolerates missing jobs"));
}

#[test]
fn accept_rolls_forward_over_a_racing_withdrawal() {
    let (service, store, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    let winning = service
        .submit_bid(&job.job_id, &wid("worker-1"), bid_request(2800.0))
        .expect("bid lands");

    let racing = Arc::new(WithdrawingStore {
        inner: Arc::clone(&store),
        fired: AtomicBool::new(false),
    });
    let lifecycle = JobLifecycle::new(racing, DEFAULT_EXPIRY_DAYS);

    let awarded = lifecycle
        .accept_bid(&job.job_id, &winning.bid_id)
        .expect("the award stands despite the racing withdrawal");
    assert_eq!(awarded.status, JobStatus::InProgress);
    assert_eq!(awarded.accepted_bid_id.as_ref(), Some(&winning.bid_id));

    let winner = store
        .fetch_bid(&job.job_id, &winning.bid_id)
        .expect("fetch succeeds")
        .expect("bid present");
    assert_eq!(winner.status, BidStatus::Accepted);
}

#[test]
fn settlement_resumes_after_an_interrupted_award() {
    let (service, store, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    register_worker(&directory, "worker-2");
    let winning = service
        .submit_bid(&job.job_id, &wid("worker-1"), bid_request(2800.0))
        .expect("first bid lands");
    service
        .submit_bid(&job.job_id, &wid("worker-2"), bid_request(3200.0))
        .expect("second bid lands");

    // The award committed but settlement never ran.
    let mut awarded = store
        .fetch_job(&job.job_id)
        .expect("fetch succeeds")
        .expect("job present");
    awarded.status = JobStatus::InProgress;
    awarded.accepted_bid_id = Some(winning.bid_id.clone());
    store
        .update_job(&awarded, JobStatus::Open)
        .expect("award commits");

    let lifecycle = JobLifecycle::new(Arc::clone(&store), DEFAULT_EXPIRY_DAYS);
    lifecycle
        .settle_bids(&job.job_id, &winning.bid_id)
        .expect("settlement resumes");

    let bids = store.bids_for_job(&job.job_id).expect("bids readable");
    assert_eq!(
        bids.iter().filter(|bid| bid.status == BidStatus::Accepted).count(),
        1
    );
    assert_eq!(
        bids.iter().filter(|bid| bid.status == BidStatus::Rejected).count(),
        1
    );
}

#[test]
fn concurrent_accepts_award_exactly_once() {
    let (service, store, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    register_worker(&directory, "worker-2");
    let first = service
        .submit_bid(&job.job_id, &wid("worker-1"), bid_request(2800.0))
        .expect("first bid lands");
    let second = service
        .submit_bid(&job.job_id, &wid("worker-2"), bid_request(3200.0))
        .expect("second bid lands");

    let service = Arc::new(service);
    let handles: Vec<_> = [first.bid_id.clone(), second.bid_id.clone()]
        .into_iter()
        .map(|bid_id| {
            let service = Arc::clone(&service);
            let job_id = job.job_id.clone();
            std::thread::spawn(move || service.accept_bid("buyer-1", &job_id, &bid_id))
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("accept thread joins"))
        .collect();

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(matches!(
                err,
                MarketplaceError::InvalidState(_) | MarketplaceError::Conflict(_)
            ));
        }
    }

    let bids = store.bids_for_job(&job.job_id).expect("bids readable");
    assert_eq!(
        bids.iter().filter(|bid| bid.status == BidStatus::Accepted).count(),
        1
    );
    assert_eq!(service.job(&job.job_id).unwrap().status, JobStatus::InProgress);
}

#[test]
fn loser_sweep_is_idempotent() {
    let (service, store, directory, _) = build_service();
    let job = open_job(&service, "buyer-1");
    register_worker(&directory, "worker-1");
    register_worker(&directory, "worker-2");

    let winning = service
        .submit_bid(
            &job.job_id,
            &wid("worker-1"),
            bid_request(2800.0),
        )
        .expect("first bid lands");
    service
        .submit_bid(
            &job.job_id,
            &wid("worker-2"),
            bid_request(3200.0),
        )
        .expect("second bid lands");
    service
        .accept_bid("buyer-1", &job.job_id, &winning.bid_id)
        .expect("accept succeeds");

    let lifecycle = JobLifecycle::new(Arc::clone(&store), DEFAULT_EXPIRY_DAYS);
    lifecycle
        .settle_bids(&job.job_id, &winning.bid_id)
        .expect("re-running the sweep is safe");

    let bids = store.bids_for_job(&job.job_id).expect("bids readable");
    assert_eq!(
        bids.iter().filter(|bid| bid.status == BidStatus::Accepted).count(),
        1
    );
    assert_eq!(
        bids.iter().filter(|bid| bid.status == BidStatus::Rejected).count(),
        1
    );
}
