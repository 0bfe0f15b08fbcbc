//! KYC domain module
//!
//! Identity verification gating studio payouts.

mod model;
mod service;
mod workflow;

pub use model::*;
pub use service::KycService;
pub use workflow::KycVerificationWorkflow;
