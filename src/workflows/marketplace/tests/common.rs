use std::sync::Arc;

use chrono::Duration;

use crate::workflows::marketplace::domain::{
    BidRequest, BudgetRange, Job, JobDraft, WorkerId, WorkerProfile,
};
use crate::workflows::marketplace::memory::{MemoryDirectory, MemoryNotifier, MemoryStore};
use crate::workflows::marketplace::notify::{MarketplaceEvent, Notifier, NotifyError};
use crate::workflows::marketplace::service::MarketplaceService;
use crate::workflows::marketplace::store::{MarketplaceStore, WorkerDirectory};

pub(super) type MemoryService = MarketplaceService<MemoryStore, MemoryDirectory, MemoryNotifier>;

pub(super) fn draft() -> JobDraft {
    JobDraft {
        title: "Fix leaking roof".to_string(),
        description: "Need an experienced roofer to repair storm damage and replace broken tiles"
            .to_string(),
        category: "roofing".to_string(),
        skills: vec!["roofing".to_string(), "waterproofing".to_string()],
        location: "Khayelitsha, Cape Town".to_string(),
        budget: BudgetRange {
            min: 1000.0,
            max: 5000.0,
            currency: "ZAR".to_string(),
        },
        timeline: "2 weeks".to_string(),
    }
}

pub(super) fn worker(id: &str) -> WorkerProfile {
    WorkerProfile {
        worker_id: WorkerId(id.to_string()),
        display_name: "Sipho Ndlovu".to_string(),
        skills: vec!["roof repair".to_string(), "tiles".to_string()],
        trust_score: Some(90.0),
        completion_rate: Some(95.0),
        avg_price: Some(3000.0),
        available: true,
        verified: true,
        id_verified: true,
    }
}

pub(super) fn wid(id: &str) -> WorkerId {
    WorkerId(id.to_string())
}

pub(super) fn bid_request(quote: f64) -> BidRequest {
    BidRequest {
        quote,
        currency: "ZAR".to_string(),
        timeline: "10 days".to_string(),
        proposal: "Can start Monday with my own scaffolding".to_string(),
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<MemoryStore>,
    Arc<MemoryDirectory>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let directory = Arc::new(MemoryDirectory::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = MarketplaceService::new(store.clone(), directory.clone(), notifier.clone());
    (service, store, directory, notifier)
}

pub(super) fn open_job(service: &MemoryService, buyer: &str) -> Job {
    open_job_with(service, buyer)
}

pub(super) fn open_job_with<S, D, N>(service: &MarketplaceService<S, D, N>, buyer: &str) -> Job
where
    S: MarketplaceStore + 'static,
    D: WorkerDirectory + 'static,
    N: Notifier + 'static,
{
    service.create_job(buyer, draft()).expect("job opens")
}

pub(super) fn register_worker(directory: &MemoryDirectory, id: &str) -> WorkerProfile {
    let profile = worker(id);
    directory.upsert(profile.clone());
    profile
}

/// Rewrites a job's creation time so expiry scenarios can age it.
pub(super) fn backdate(store: &MemoryStore, job: &Job, days: i64) {
    let mut aged = store
        .fetch_job(&job.job_id)
        .expect("fetch succeeds")
        .expect("job present");
    aged.created_at -= Duration::days(days);
    store
        .update_job(&aged, aged.status)
        .expect("backdate write succeeds");
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn publish(&self, _event: &MarketplaceEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("queue offline".to_string()))
    }
}
