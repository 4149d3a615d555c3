use serde::{Deserialize, Serialize};

use super::domain::{BidId, JobId, WorkerId};

/// Events handed to the notification collaborator (email/SMS/WhatsApp
/// fan-out happens downstream). Delivery is fire-and-forget with
/// at-least-once semantics; the workflows never roll back on publish
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum MarketplaceEvent {
    BidReceived {
        job_id: JobId,
        bid_id: BidId,
        worker_id: WorkerId,
        worker_name: String,
        quote: f64,
        buyer_id: String,
    },
    BidAccepted {
        job_id: JobId,
        bid_id: BidId,
        worker_id: WorkerId,
        buyer_id: String,
    },
    JobCancelled {
        job_id: JobId,
        buyer_id: String,
        reason: String,
    },
}

impl MarketplaceEvent {
    pub const fn topic(&self) -> &'static str {
        match self {
            MarketplaceEvent::BidReceived { .. } => "bid.received",
            MarketplaceEvent::BidAccepted { .. } => "bid.accepted",
            MarketplaceEvent::JobCancelled { .. } => "job.cancelled",
        }
    }
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound notification hook.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: &MarketplaceEvent) -> Result<(), NotifyError>;
}

/// Default notifier for local runs: writes the event to the service log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, event: &MarketplaceEvent) -> Result<(), NotifyError> {
        tracing::info!(topic = event.topic(), "notification dispatched");
        Ok(())
    }
}
