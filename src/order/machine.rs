//! Order status machine
//!
//! ```text
//! pending -> confirmed -> processing -> shipped -> delivered
//!    \___________\______________\__________\____> cancelled | refunded
//! ```
//!
//! delivered, cancelled and refunded are terminal.

use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;

use super::model::{Order, OrderStatus, PaymentStatus, TrackingEvent, UpdateOrderStatusRequest};
use crate::workflow::{plan_transition, Lifecycle, Step, WorkflowError};

impl Lifecycle for OrderStatus {
    const ENTITY: &'static str = "order";

    fn allows(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Confirmed | Processing | Shipped, Cancelled | Refunded)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

pub struct OrderStatusMachine;

impl OrderStatusMachine {
    /// Apply `change` to `order` in memory.
    ///
    /// On error the order is left untouched. On [`Step::Advance`] the status,
    /// tracking, payment status and history have been updated and the caller
    /// must persist them.
    pub fn transition(
        order: &mut Order,
        change: &UpdateOrderStatusRequest,
        at: DateTime<Utc>,
    ) -> Result<Step, WorkflowError> {
        let target = change.status;
        if plan_transition(order.status, target)? == Step::Unchanged {
            return Ok(Step::Unchanged);
        }

        let tracking = match &change.tracking {
            Some(info) => Some(info.normalized()?),
            None => None,
        };
        if target == OrderStatus::Shipped && tracking.is_none() && order.tracking.is_none() {
            return Err(WorkflowError::MissingTrackingInfo);
        }

        // everything validated; mutate from here on
        if let Some(info) = tracking {
            order.tracking = Some(Json(info));
        }
        match target {
            OrderStatus::Refunded => order.payment_status = PaymentStatus::Refunded,
            OrderStatus::Delivered => order.delivered_at = Some(at),
            _ => {}
        }

        let message = change
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_message(order, target));

        order.status = target;
        order.tracking_history.push(TrackingEvent {
            status: target,
            timestamp: at,
            message,
        });
        order.updated_at = at;

        Ok(Step::Advance)
    }
}

fn default_message(order: &Order, status: OrderStatus) -> String {
    match status {
        OrderStatus::Pending => "Order placed".to_string(),
        OrderStatus::Confirmed => "Order confirmed".to_string(),
        OrderStatus::Processing => "Order is being prepared".to_string(),
        OrderStatus::Shipped => match order.tracking.as_deref() {
            Some(t) => format!("Shipped with {} ({})", t.carrier, t.tracking_number),
            None => "Order shipped".to_string(),
        },
        OrderStatus::Delivered => "Order delivered".to_string(),
        OrderStatus::Cancelled => "Order cancelled".to_string(),
        OrderStatus::Refunded => "Order refunded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::model::{CreateOrderRequest, ItemType, NewOrderItem, TrackingInfo};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn digital_order() -> Order {
        CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![NewOrderItem {
                item_type: ItemType::Course,
                reference_id: Uuid::new_v4(),
                name: "Glazing basics".to_string(),
                unit_price: Decimal::from(40),
                quantity: 1,
                image: None,
            }],
            shipping_address: None,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
        }
        .into_order(Uuid::new_v4(), Utc::now())
        .unwrap()
    }

    fn change(status: OrderStatus) -> UpdateOrderStatusRequest {
        UpdateOrderStatusRequest {
            status,
            tracking: None,
            message: None,
        }
    }

    #[test]
    fn test_shipped_message_mentions_carrier() {
        let mut order = digital_order();
        order.status = OrderStatus::Processing;
        let mut to_shipped = change(OrderStatus::Shipped);
        to_shipped.tracking = Some(TrackingInfo {
            carrier: "DHL".to_string(),
            tracking_number: "JD014600".to_string(),
            tracking_url: None,
            estimated_delivery: None,
        });

        OrderStatusMachine::transition(&mut order, &to_shipped, Utc::now()).unwrap();
        let last = order.tracking_history.last().unwrap();
        assert_eq!(last.message, "Shipped with DHL (JD014600)");
    }

    #[test]
    fn test_refund_marks_payment_refunded() {
        let mut order = digital_order();
        OrderStatusMachine::transition(&mut order, &change(OrderStatus::Refunded), Utc::now()).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
        assert!(order.status.is_terminal());
    }

    #[test]
    fn test_custom_message_is_kept() {
        let mut order = digital_order();
        let mut confirm = change(OrderStatus::Confirmed);
        confirm.message = Some("Studio accepted the order".to_string());
        OrderStatusMachine::transition(&mut order, &confirm, Utc::now()).unwrap();
        assert_eq!(
            order.tracking_history.last().map(|e| e.message.as_str()),
            Some("Studio accepted the order")
        );
    }

    #[test]
    fn test_invalid_supplied_tracking_leaves_order_untouched() {
        let mut order = digital_order();
        order.status = OrderStatus::Processing;
        let before = order.clone();
        let mut to_shipped = change(OrderStatus::Shipped);
        to_shipped.tracking = Some(TrackingInfo {
            carrier: "".to_string(),
            tracking_number: "X1".to_string(),
            tracking_url: None,
            estimated_delivery: None,
        });

        let err = OrderStatusMachine::transition(&mut order, &to_shipped, Utc::now()).unwrap_err();
        assert_eq!(err, WorkflowError::MissingTrackingInfo);
        assert_eq!(order.status, before.status);
        assert_eq!(order.tracking_history.len(), before.tracking_history.len());
    }
}
