//! Marketplace core: the job lifecycle state machine, the bid submission
//! workflow, the worker matching scorer, and the delay-risk estimator.
//!
//! Storage, worker profiles, and notification delivery are external
//! collaborators consumed through the traits in [`store`] and [`notify`];
//! the in-memory adapters in [`memory`] back the dev server and tests.

pub mod bids;
pub mod domain;
mod errors;
pub mod lifecycle;
pub mod matching;
pub mod memory;
pub mod notify;
pub mod risk;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use bids::BidWorkflow;
pub use domain::{
    Bid, BidId, BidRequest, BidStatus, BidSummary, BudgetRange, Job, JobDraft, JobId, JobStatus,
    JobView, WorkerId, WorkerProfile,
};
pub use errors::MarketplaceError;
pub use lifecycle::{JobLifecycle, DEFAULT_EXPIRY_DAYS};
pub use matching::{MatchExplanation, MatchFactor, MatchResult, MatchingConfig, MatchingEngine};
pub use memory::{MemoryDirectory, MemoryNotifier, MemoryStore};
pub use notify::{LogNotifier, MarketplaceEvent, Notifier, NotifyError};
pub use risk::{estimate, DelayRiskAssessment, DelayRiskFeatures, RiskFactor, RiskLevel};
pub use router::{marketplace_router, RequestContext, Role};
pub use service::MarketplaceService;
pub use store::{ItemKey, MarketplaceStore, StoreError, WorkerDirectory};
