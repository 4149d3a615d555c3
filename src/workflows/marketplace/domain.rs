use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for bids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub String);

/// Identifier wrapper for worker accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub String);

/// Buyer-declared budget envelope for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

impl BudgetRange {
    /// Representative single figure used wherever a job needs one budget
    /// number (price-fit scoring).
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Buyer-submitted fields for a new job posting, validated at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    pub location: String,
    pub budget: BudgetRange,
    pub timeline: String,
}

/// Authoritative lifecycle states for a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
    Expired,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Expired => "expired",
        }
    }

    pub const fn accepts_bids(self) -> bool {
        matches!(self, JobStatus::Open)
    }
}

/// Persisted job record. Mutated only through the lifecycle manager and the
/// bid workflow; never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub buyer_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    pub location: String,
    pub budget: BudgetRange,
    pub timeline: String,
    pub status: JobStatus,
    pub bid_count: u32,
    pub accepted_bid_id: Option<BidId>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.job_id.clone(),
            title: self.title.clone(),
            status: self.status.label(),
            bid_count: self.bid_count,
            accepted_bid_id: self.accepted_bid_id.clone(),
            budget: self.budget.clone(),
        }
    }
}

/// Sanitized job representation returned by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub title: String,
    pub status: &'static str,
    pub bid_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_bid_id: Option<BidId>,
    pub budget: BudgetRange,
}

/// Lifecycle states for a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
            BidStatus::Withdrawn => "withdrawn",
        }
    }
}

/// Worker-submitted fields for a new bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
    pub quote: f64,
    pub currency: String,
    pub timeline: String,
    #[serde(default)]
    pub proposal: String,
}

/// Persisted bid record. Identified by the composite (job, worker) key so a
/// worker can hold at most one bid per job. The trust and completion
/// snapshots are frozen at submission time and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub bid_id: BidId,
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub quote: f64,
    pub currency: String,
    pub timeline: String,
    pub proposal: String,
    pub status: BidStatus,
    pub trust_score_snapshot: Option<f64>,
    pub completion_rate_snapshot: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    pub fn summary(&self) -> BidSummary {
        BidSummary {
            bid_id: self.bid_id.clone(),
            job_id: self.job_id.clone(),
            quote: self.quote,
            status: self.status.label(),
            created_at: self.created_at,
        }
    }
}

/// Public fields of a bid returned to its submitter.
#[derive(Debug, Clone, Serialize)]
pub struct BidSummary {
    pub bid_id: BidId,
    pub job_id: JobId,
    pub quote: f64,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

/// Read-only worker snapshot owned by the external profile collaborator.
/// Scoring inputs are optional; the scorer substitutes neutral values for
/// anything missing rather than excluding the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub worker_id: WorkerId,
    pub display_name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Canonical 0-100 scale.
    pub trust_score: Option<f64>,
    /// Percentage of awarded jobs completed, 0-100.
    pub completion_rate: Option<f64>,
    pub avg_price: Option<f64>,
    pub available: bool,
    pub verified: bool,
    pub id_verified: bool,
}

impl WorkerProfile {
    pub fn fully_verified(&self) -> bool {
        self.verified && self.id_verified
    }
}
