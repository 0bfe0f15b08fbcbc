//! Support domain module
//!
//! Ticket intake, the reply thread and staff status changes.

mod model;
mod service;
mod workflow;

pub use model::*;
pub use service::SupportService;
pub use workflow::{generate_ticket_number, SupportTicketWorkflow};
