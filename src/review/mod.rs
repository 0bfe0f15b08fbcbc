//! Review domain module

mod model;
mod service;
mod workflow;

pub use model::*;
pub use service::ReviewService;
pub use workflow::ReviewModerationWorkflow;
