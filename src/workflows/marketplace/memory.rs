use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Bid, BidId, BidStatus, Job, JobId, JobStatus, WorkerId, WorkerProfile};
use super::notify::{MarketplaceEvent, Notifier, NotifyError};
use super::store::{ItemKey, MarketplaceStore, StoreError, WorkerDirectory};

/// In-memory single-table adapter backing the dev server and the test
/// suites. A single mutex over the table makes every trait method atomic,
/// which is how it honors the conditional-write contracts.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemKey, StoredItem>>,
}

#[derive(Debug, Clone)]
enum StoredItem {
    Job(Job),
    Bid(Bid),
}

impl MemoryStore {
    fn table(&self) -> Result<MutexGuard<'_, BTreeMap<ItemKey, StoredItem>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Unavailable("table mutex poisoned".to_string()))
    }
}

impl MarketplaceStore for MemoryStore {
    fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut items = self.table()?;
        let key = ItemKey::job(&job.job_id);
        if items.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        items.insert(key, StoredItem::Job(job.clone()));
        Ok(())
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let items = self.table()?;
        Ok(match items.get(&ItemKey::job(id)) {
            Some(StoredItem::Job(job)) => Some(job.clone()),
            _ => None,
        })
    }

    fn update_job(&self, job: &Job, expected: JobStatus) -> Result<(), StoreError> {
        let mut items = self.table()?;
        let key = ItemKey::job(&job.job_id);
        match items.get_mut(&key) {
            Some(StoredItem::Job(stored)) if stored.status == expected => {
                *stored = job.clone();
                Ok(())
            }
            Some(StoredItem::Job(_)) => Err(StoreError::Conflict),
            _ => Err(StoreError::NotFound),
        }
    }

    fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let items = self.table()?;
        Ok(items
            .values()
            .filter_map(|item| match item {
                StoredItem::Job(job) if job.status == status => Some(job.clone()),
                _ => None,
            })
            .collect())
    }

    fn insert_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        let mut items = self.table()?;
        let key = ItemKey::bid(&bid.job_id, &bid.worker_id);
        if items.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        items.insert(key, StoredItem::Bid(bid.clone()));
        Ok(())
    }

    fn fetch_bid(&self, job_id: &JobId, bid_id: &BidId) -> Result<Option<Bid>, StoreError> {
        let items = self.table()?;
        Ok(items.values().find_map(|item| match item {
            StoredItem::Bid(bid) if bid.job_id == *job_id && bid.bid_id == *bid_id => {
                Some(bid.clone())
            }
            _ => None,
        }))
    }

    fn bids_for_job(&self, job_id: &JobId) -> Result<Vec<Bid>, StoreError> {
        let items = self.table()?;
        Ok(items
            .values()
            .filter_map(|item| match item {
                StoredItem::Bid(bid) if bid.job_id == *job_id => Some(bid.clone()),
                _ => None,
            })
            .collect())
    }

    fn update_bid(&self, bid: &Bid, expected: BidStatus) -> Result<(), StoreError> {
        let mut items = self.table()?;
        let key = ItemKey::bid(&bid.job_id, &bid.worker_id);
        match items.get_mut(&key) {
            Some(StoredItem::Bid(stored)) if stored.status == expected => {
                *stored = bid.clone();
                Ok(())
            }
            Some(StoredItem::Bid(_)) => Err(StoreError::Conflict),
            _ => Err(StoreError::NotFound),
        }
    }

    fn increment_bid_count(&self, job_id: &JobId, delta: i64) -> Result<u32, StoreError> {
        let mut items = self.table()?;
        match items.get_mut(&ItemKey::job(job_id)) {
            Some(StoredItem::Job(job)) => {
                let next = (i64::from(job.bid_count) + delta).max(0);
                job.bid_count = next as u32;
                Ok(job.bid_count)
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

/// In-memory stand-in for the external profile collaborator.
#[derive(Default)]
pub struct MemoryDirectory {
    profiles: Mutex<HashMap<WorkerId, WorkerProfile>>,
}

impl MemoryDirectory {
    pub fn upsert(&self, profile: WorkerProfile) {
        let mut profiles = self.profiles.lock().expect("directory mutex poisoned");
        profiles.insert(profile.worker_id.clone(), profile);
    }
}

impl WorkerDirectory for MemoryDirectory {
    fn profile(&self, worker_id: &WorkerId) -> Result<Option<WorkerProfile>, StoreError> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|_| StoreError::Unavailable("directory mutex poisoned".to_string()))?;
        Ok(profiles.get(worker_id).cloned())
    }
}

/// Notifier that records published events so callers can assert on them.
#[derive(Default, Clone)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<MarketplaceEvent>>>,
}

impl MemoryNotifier {
    pub fn events(&self) -> Vec<MarketplaceEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn publish(&self, event: &MarketplaceEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event.clone());
        Ok(())
    }
}
