use super::store::StoreError;

/// Error taxonomy surfaced to callers. Each variant carries a stable kind
/// tag so clients can distinguish outcomes that share an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Transient(String),
}

impl MarketplaceError {
    pub const fn kind(&self) -> &'static str {
        match self {
            MarketplaceError::Validation(_) => "validation",
            MarketplaceError::Forbidden(_) => "forbidden",
            MarketplaceError::NotFound(_) => "not_found",
            MarketplaceError::InvalidState(_) => "invalid_state",
            MarketplaceError::Conflict(_) => "conflict",
            MarketplaceError::Transient(_) => "transient",
        }
    }
}

/// Fallback mapping for store failures. Call sites that can attribute a
/// conditional-write failure to a specific cause map it themselves before
/// reaching for this.
impl From<StoreError> for MarketplaceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict => Self::Conflict("concurrent update lost".to_string()),
            StoreError::NotFound => Self::NotFound("item"),
            StoreError::Unavailable(detail) => Self::Transient(detail),
        }
    }
}
