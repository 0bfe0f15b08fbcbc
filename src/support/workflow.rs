//! Support ticket rules
//!
//! open, in_progress and waiting_customer move freely among themselves and on
//! to resolved or closed. resolved and closed are final: no reopening and no
//! further replies.

use rand::{distributions::Alphanumeric, Rng};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{CreateTicketRequest, SupportTicket, TicketReply, TicketStatus};
use crate::workflow::{plan_transition, require_text, Lifecycle, Step, WorkflowError};

impl Lifecycle for TicketStatus {
    const ENTITY: &'static str = "ticket";

    fn allows(self, _next: Self) -> bool {
        // every edge out of a non-terminal status is allowed
        !self.is_terminal()
    }

    fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

pub struct SupportTicketWorkflow;

impl SupportTicketWorkflow {
    /// New open ticket; category and priority default to other/medium
    pub fn create(
        user_id: Uuid,
        request: &CreateTicketRequest,
        now: DateTime<Utc>,
    ) -> Result<SupportTicket, WorkflowError> {
        let subject = require_text("subject", &request.subject)?;
        let description = require_text("description", &request.description)?;

        Ok(SupportTicket {
            id: Uuid::new_v4(),
            ticket_number: generate_ticket_number(),
            user_id,
            subject,
            description,
            category: request.category.unwrap_or_default(),
            priority: request.priority.unwrap_or_default(),
            status: TicketStatus::Open,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Append a reply. The ticket status is left as it is.
    pub fn reply(
        ticket: &mut SupportTicket,
        author_id: Uuid,
        message: &str,
        is_staff: bool,
        now: DateTime<Utc>,
    ) -> Result<TicketReply, WorkflowError> {
        if ticket.status.is_terminal() {
            return Err(WorkflowError::NotEligible(format!(
                "ticket {} is {}",
                ticket.ticket_number, ticket.status
            )));
        }
        let message = require_text("message", message)?;

        let reply = TicketReply {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            author_id,
            message,
            is_staff,
            created_at: now,
        };
        ticket.replies.push(reply.clone());
        ticket.updated_at = now;
        Ok(reply)
    }

    pub fn change_status(
        ticket: &mut SupportTicket,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Step, WorkflowError> {
        let step = plan_transition(ticket.status, status)?;
        if step == Step::Advance {
            ticket.status = status;
            ticket.updated_at = now;
        }
        Ok(step)
    }
}

/// `TKT-XXXXXXXX`
pub fn generate_ticket_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("TKT-{}", suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::model::{TicketCategory, TicketPriority};

    fn ticket() -> SupportTicket {
        SupportTicketWorkflow::create(
            Uuid::new_v4(),
            &CreateTicketRequest {
                subject: "Workshop moved".to_string(),
                description: "The date changed after I booked".to_string(),
                category: None,
                priority: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let ticket = ticket();
        assert_eq!(ticket.category, TicketCategory::Other);
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.ticket_number.len(), 12);
        assert!(ticket.ticket_number.starts_with("TKT-"));
    }

    #[test]
    fn test_blank_subject_rejected() {
        let request = CreateTicketRequest {
            subject: "   ".to_string(),
            description: "something".to_string(),
            category: None,
            priority: None,
        };
        assert!(matches!(
            SupportTicketWorkflow::create(Uuid::new_v4(), &request, Utc::now()),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn test_free_movement_until_final() {
        let mut ticket = ticket();
        let now = Utc::now();
        for status in [
            TicketStatus::WaitingCustomer,
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Closed,
        ] {
            assert_eq!(
                SupportTicketWorkflow::change_status(&mut ticket, status, now),
                Ok(Step::Advance)
            );
        }
        assert!(matches!(
            SupportTicketWorkflow::change_status(&mut ticket, TicketStatus::Open, now),
            Err(WorkflowError::IllegalTransition { .. })
        ));
        assert!(matches!(
            SupportTicketWorkflow::change_status(&mut ticket, TicketStatus::Resolved, now),
            Err(WorkflowError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_no_replies_on_resolved_ticket() {
        let mut ticket = ticket();
        let owner = ticket.user_id;
        SupportTicketWorkflow::change_status(&mut ticket, TicketStatus::Resolved, Utc::now()).unwrap();
        let err = SupportTicketWorkflow::reply(&mut ticket, owner, "Still broken", false, Utc::now())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotEligible(_)));
        assert!(ticket.replies.is_empty());
    }
}
