//! Return request rules
//!
//! Only delivered physical items can be returned, once per item unless the
//! earlier request was rejected. Admins decide pending requests; what happens
//! after approval (refund, pickup) is handled outside this service.

use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::model::{
    DecideReturnRequest, Evidence, ReturnRequest, ReturnStatus, SubmitReturnRequest, MAX_EVIDENCE,
};
use crate::order::{Order, OrderItem, OrderStatus};
use crate::workflow::{plan_transition, require_text, Lifecycle, Step, WorkflowError};

impl Lifecycle for ReturnStatus {
    const ENTITY: &'static str = "return";

    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (ReturnStatus::Pending, ReturnStatus::Approved | ReturnStatus::Rejected)
        )
    }

    fn is_terminal(self) -> bool {
        !matches!(self, ReturnStatus::Pending)
    }
}

pub struct ReturnRequestWorkflow;

impl ReturnRequestWorkflow {
    /// Delivered order, physical item, and no open claim on that item
    pub fn is_eligible(order: &Order, item: &OrderItem, existing: &[ReturnRequest]) -> bool {
        order.status == OrderStatus::Delivered
            && item.item_type.requires_shipping()
            && !existing
                .iter()
                .any(|r| r.order_id == order.id && r.item_id == item.id && r.is_open_claim())
    }

    /// Build a pending request for `buyer_id`.
    ///
    /// `order` is `None` when the order does not exist or belongs to someone
    /// else; both read as not eligible.
    pub fn submit(
        order: Option<&Order>,
        existing: &[ReturnRequest],
        buyer_id: Uuid,
        request: &SubmitReturnRequest,
        now: DateTime<Utc>,
    ) -> Result<ReturnRequest, WorkflowError> {
        let order = order
            .filter(|o| o.id == request.order_id && o.buyer_id == buyer_id)
            .ok_or_else(|| WorkflowError::NotEligible("order not found for this buyer".to_string()))?;
        let item = order
            .item(request.item_id)
            .ok_or_else(|| WorkflowError::NotEligible("item is not part of this order".to_string()))?;

        if !Self::is_eligible(order, item, existing) {
            return Err(WorkflowError::NotEligible(format!(
                "item '{}' cannot be returned",
                item.name
            )));
        }

        if request.evidence.is_empty() {
            return Err(WorkflowError::EvidenceRequired);
        }
        if request.evidence.len() > MAX_EVIDENCE {
            return Err(WorkflowError::EvidenceLimitExceeded {
                count: request.evidence.len(),
                max: MAX_EVIDENCE,
            });
        }

        let description = require_text("description", &request.description)?;
        let evidence = request
            .evidence
            .iter()
            .map(|e| {
                Ok(Evidence {
                    kind: e.kind,
                    url: require_text("evidence url", &e.url)?,
                })
            })
            .collect::<Result<Vec<_>, WorkflowError>>()?;

        Ok(ReturnRequest {
            id: Uuid::new_v4(),
            order_id: order.id,
            item_id: item.id,
            buyer_id,
            request_type: request.request_type,
            reason: request.reason,
            description,
            evidence: Json(evidence),
            status: ReturnStatus::Pending,
            admin_note: None,
            decided_by: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approve or reject a pending request
    pub fn decide(
        request: &mut ReturnRequest,
        decision: &DecideReturnRequest,
        admin_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Step, WorkflowError> {
        if decision.status == ReturnStatus::Pending {
            return Err(WorkflowError::Validation(
                "decision must be approved or rejected".to_string(),
            ));
        }
        let step = plan_transition(request.status, decision.status)?;
        if step == Step::Advance {
            request.status = decision.status;
            request.admin_note = decision
                .note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            request.decided_by = Some(admin_id);
            request.decided_at = Some(at);
            request.updated_at = at;
        }
        Ok(step)
    }
}
