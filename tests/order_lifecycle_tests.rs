//! Order status machine scenarios
//!
//! Walks orders through the lifecycle in memory and checks the history,
//! payment status and tracking side effects of each step.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use studiomart_server::order::{
    CreateOrderRequest, ItemType, NewOrderItem, Order, OrderStatus, OrderStatusMachine,
    PaymentStatus, ShippingAddress, TrackingInfo, UpdateOrderStatusRequest,
};
use studiomart_server::workflow::{Lifecycle, Step, WorkflowError};

fn physical_order() -> Order {
    CreateOrderRequest {
        studio_id: Uuid::new_v4(),
        items: vec![NewOrderItem {
            item_type: ItemType::Product,
            reference_id: Uuid::new_v4(),
            name: "Stoneware mug".to_string(),
            unit_price: Decimal::new(2450, 2),
            quantity: 2,
            image: None,
        }],
        shipping_address: Some(ShippingAddress {
            full_name: "Sam Rivera".to_string(),
            line1: "12 Kiln Street".to_string(),
            line2: None,
            city: "Portland".to_string(),
            state: Some("OR".to_string()),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
            phone: None,
        }),
        tax: Decimal::new(400, 2),
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

fn ship() -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: OrderStatus::Shipped,
        tracking: Some(TrackingInfo {
            carrier: " UPS ".to_string(),
            tracking_number: "1Z999AA10123456784".to_string(),
            tracking_url: None,
            estimated_delivery: None,
        }),
        message: None,
    }
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_new_order_totals_and_initial_history() {
    let order = physical_order();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.subtotal, Decimal::new(4900, 2));
    assert_eq!(order.total, Decimal::new(5300, 2));
    assert_eq!(order.tracking_history.len(), 1);
    assert!(order.order_number.starts_with("ORD-"));
}

#[test]
fn test_physical_order_requires_address() {
    let request = CreateOrderRequest {
        studio_id: Uuid::new_v4(),
        items: vec![NewOrderItem {
            item_type: ItemType::Product,
            reference_id: Uuid::new_v4(),
            name: "Vase".to_string(),
            unit_price: Decimal::from(30),
            quantity: 1,
            image: None,
        }],
        shipping_address: None,
        tax: Decimal::ZERO,
        discount: Decimal::ZERO,
    };

    let err = request.into_order(Uuid::new_v4(), Utc::now()).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

// ============================================================================
// Transitions
// ============================================================================

#[test]
fn test_happy_path_appends_one_entry_per_step() {
    let mut order = physical_order();
    let mut at = Utc::now();

    for request in [
        change(OrderStatus::Confirmed),
        change(OrderStatus::Processing),
        ship(),
        change(OrderStatus::Delivered),
    ] {
        let before = order.tracking_history.len();
        at += Duration::minutes(5);

        let step = OrderStatusMachine::transition(&mut order, &request, at).unwrap();

        assert_eq!(step, Step::Advance);
        assert_eq!(order.status, request.status);
        assert_eq!(order.tracking_history.len(), before + 1);
        assert_eq!(order.tracking_history.last().map(|e| e.status), Some(request.status));
    }

    assert_eq!(order.delivered_at, Some(at));
    assert_eq!(order.tracking.as_ref().map(|t| t.carrier.as_str()), Some("UPS"));
    assert!(order.status.is_terminal());
}

#[test]
fn test_shipped_message_names_carrier() {
    let mut order = physical_order();
    let now = Utc::now();
    OrderStatusMachine::transition(&mut order, &change(OrderStatus::Confirmed), now).unwrap();
    OrderStatusMachine::transition(&mut order, &change(OrderStatus::Processing), now).unwrap();
    OrderStatusMachine::transition(&mut order, &ship(), now).unwrap();

    let last = order.tracking_history.last().unwrap();
    assert_eq!(last.message, "Shipped with UPS (1Z999AA10123456784)");
}

#[test]
fn test_skipping_ahead_is_rejected_without_side_effects() {
    let mut order = physical_order();
    let snapshot = serde_json::to_value(&order).unwrap();

    let err = OrderStatusMachine::transition(&mut order, &change(OrderStatus::Delivered), Utc::now())
        .unwrap_err();

    assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
    assert_eq!(serde_json::to_value(&order).unwrap(), snapshot);
}

#[test]
fn test_terminal_order_cannot_move_backwards() {
    let mut order = physical_order();
    let now = Utc::now();
    for request in [
        change(OrderStatus::Confirmed),
        change(OrderStatus::Processing),
        ship(),
        change(OrderStatus::Delivered),
    ] {
        OrderStatusMachine::transition(&mut order, &request, now).unwrap();
    }
    let history = order.tracking_history.len();

    let err = OrderStatusMachine::transition(&mut order, &change(OrderStatus::Processing), now)
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::IllegalTransition {
            entity: "order",
            from: "delivered".to_string(),
            to: "processing".to_string(),
        }
    );
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.tracking_history.len(), history);
}

#[test]
fn test_shipping_without_tracking_fails() {
    let mut order = physical_order();
    let now = Utc::now();
    OrderStatusMachine::transition(&mut order, &change(OrderStatus::Confirmed), now).unwrap();
    OrderStatusMachine::transition(&mut order, &change(OrderStatus::Processing), now).unwrap();

    let err = OrderStatusMachine::transition(&mut order, &change(OrderStatus::Shipped), now)
        .unwrap_err();

    assert_eq!(err, WorkflowError::MissingTrackingInfo);
    assert_eq!(order.status, OrderStatus::Processing);
}

#[test]
fn test_same_status_is_a_no_op() {
    let mut order = physical_order();
    let history = order.tracking_history.len();

    let step = OrderStatusMachine::transition(&mut order, &change(OrderStatus::Pending), Utc::now())
        .unwrap();

    assert_eq!(step, Step::Unchanged);
    assert_eq!(order.tracking_history.len(), history);
}

#[test]
fn test_refund_marks_payment_refunded() {
    let mut order = physical_order();
    let now = Utc::now();
    OrderStatusMachine::transition(&mut order, &change(OrderStatus::Confirmed), now).unwrap();

    let request = UpdateOrderStatusRequest {
        status: OrderStatus::Refunded,
        tracking: None,
        message: Some("Studio could not fulfil".to_string()),
    };
    OrderStatusMachine::transition(&mut order, &request, now).unwrap();

    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert_eq!(
        order.tracking_history.last().map(|e| e.message.as_str()),
        Some("Studio could not fulfil")
    );
}

// ============================================================================
// Full transition table
// ============================================================================

const ALL_STATUSES: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
];

fn request_for(status: OrderStatus) -> UpdateOrderStatusRequest {
    match status {
        OrderStatus::Shipped => ship(),
        other => change(other),
    }
}

/// A physical order driven along legal edges until it reaches `status`
fn order_in(status: OrderStatus) -> Order {
    let path: &[OrderStatus] = match status {
        OrderStatus::Pending => &[],
        OrderStatus::Confirmed => &[OrderStatus::Confirmed],
        OrderStatus::Processing => &[OrderStatus::Confirmed, OrderStatus::Processing],
        OrderStatus::Shipped => &[
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ],
        OrderStatus::Delivered => &[
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
        OrderStatus::Cancelled => &[OrderStatus::Cancelled],
        OrderStatus::Refunded => &[OrderStatus::Refunded],
    };

    let mut order = physical_order();
    for step in path {
        OrderStatusMachine::transition(&mut order, &request_for(*step), Utc::now()).unwrap();
    }
    assert_eq!(order.status, status);
    order
}

fn is_legal_edge(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    let open = matches!(from, Pending | Confirmed | Processing | Shipped);
    let forward = matches!(
        (from, to),
        (Pending, Confirmed) | (Confirmed, Processing) | (Processing, Shipped) | (Shipped, Delivered)
    );
    forward || (open && matches!(to, Cancelled | Refunded))
}

#[test]
fn test_every_status_pair() {
    let mut legal = 0;

    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            let mut order = order_in(from);
            let snapshot = serde_json::to_value(&order).unwrap();
            let history = order.tracking_history.len();

            let result = OrderStatusMachine::transition(&mut order, &request_for(to), Utc::now());

            if from == to {
                assert_eq!(result, Ok(Step::Unchanged), "{} -> {}", from, to);
                assert_eq!(serde_json::to_value(&order).unwrap(), snapshot);
            } else if is_legal_edge(from, to) {
                legal += 1;
                assert_eq!(result, Ok(Step::Advance), "{} -> {}", from, to);
                assert_eq!(order.status, to);
                assert_eq!(order.tracking_history.len(), history + 1, "{} -> {}", from, to);
                assert_eq!(order.tracking_history.last().map(|e| e.status), Some(to));
            } else {
                assert_eq!(
                    result,
                    Err(WorkflowError::IllegalTransition {
                        entity: "order",
                        from: from.to_string(),
                        to: to.to_string(),
                    }),
                    "{} -> {}",
                    from,
                    to
                );
                assert_eq!(serde_json::to_value(&order).unwrap(), snapshot);
            }
        }
    }

    // four forward edges, plus cancel and refund from each open status
    assert_eq!(legal, 12);
}

#[test]
fn test_cancel_keeps_payment_status() {
    let mut order = order_in(OrderStatus::Processing);

    let step =
        OrderStatusMachine::transition(&mut order, &change(OrderStatus::Cancelled), Utc::now())
            .unwrap();

    assert_eq!(step, Step::Advance);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(
        order.tracking_history.last().map(|e| e.message.as_str()),
        Some("Order cancelled")
    );
    assert!(order.status.is_terminal());
}

#[test]
fn test_shipped_order_can_be_refunded() {
    let mut order = order_in(OrderStatus::Shipped);

    OrderStatusMachine::transition(&mut order, &change(OrderStatus::Refunded), Utc::now()).unwrap();

    assert_eq!(order.status, OrderStatus::Refunded);
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert!(order.delivered_at.is_none());
}
