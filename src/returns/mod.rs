//! Returns domain module

mod model;
mod service;
mod workflow;

pub use model::*;
pub use service::ReturnService;
pub use workflow::ReturnRequestWorkflow;
