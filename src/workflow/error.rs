//! Business-rule violations raised by the workflows
//!
//! None of these are transient; they are surfaced to the caller and never
//! retried.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Illegal {entity} transition: {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("No shipping zone covers the destination")]
    NoZoneFound,

    #[error("No shipping rate in zone '{zone}' applies to the package")]
    NoRateApplicable { zone: String },

    #[error("Verification already decided: {0}")]
    AlreadyDecided(String),

    #[error("A reason is required to reject a verification")]
    ReasonRequired,

    #[error("At least one evidence file is required")]
    EvidenceRequired,

    #[error("At most {max} evidence files are allowed, got {count}")]
    EvidenceLimitExceeded { count: usize, max: usize },

    #[error("Carrier and tracking number are required to ship an order")]
    MissingTrackingInfo,

    #[error("{entity} {id} was modified concurrently, reload and retry")]
    ConcurrentModification { entity: &'static str, id: Uuid },
}

impl WorkflowError {
    /// Stable machine-readable code returned to API clients
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            WorkflowError::NotEligible(_) => "NOT_ELIGIBLE",
            WorkflowError::NoZoneFound => "NO_ZONE_FOUND",
            WorkflowError::NoRateApplicable { .. } => "NO_RATE_APPLICABLE",
            WorkflowError::AlreadyDecided(_) => "ALREADY_DECIDED",
            WorkflowError::ReasonRequired => "REASON_REQUIRED",
            WorkflowError::EvidenceRequired => "EVIDENCE_REQUIRED",
            WorkflowError::EvidenceLimitExceeded { .. } => "EVIDENCE_LIMIT_EXCEEDED",
            WorkflowError::MissingTrackingInfo => "MISSING_TRACKING_INFO",
            WorkflowError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
        }
    }
}
