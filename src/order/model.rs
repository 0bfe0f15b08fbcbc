//! Order models and data structures

use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::fmt;
use uuid::Uuid;

use crate::workflow::WorkflowError;

/// Order status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Catalogue item kinds. Only products ship physically.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "item_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Product,
    Course,
    Workshop,
}

impl ItemType {
    pub fn requires_shipping(self) -> bool {
        matches!(self, ItemType::Product)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub item_type: ItemType,
    /// Catalogue id of the product, course or workshop
    pub reference_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

impl OrderItem {
    /// `None` when the product does not fit a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl ShippingAddress {
    fn check(&self) -> Result<(), WorkflowError> {
        for (field, value) in [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::Validation(format!(
                    "shipping_address.{} is required",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Carrier tracking attached when an order ships
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackingInfo {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl TrackingInfo {
    /// Trimmed copy; carrier and tracking number are mandatory
    pub fn normalized(&self) -> Result<TrackingInfo, WorkflowError> {
        let carrier = self.carrier.trim();
        let tracking_number = self.tracking_number.trim();
        if carrier.is_empty() || tracking_number.is_empty() {
            return Err(WorkflowError::MissingTrackingInfo);
        }
        Ok(TrackingInfo {
            carrier: carrier.to_string(),
            tracking_number: tracking_number.to_string(),
            tracking_url: self
                .tracking_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            estimated_delivery: self.estimated_delivery,
        })
    }
}

/// One entry of the customer-visible tracking history
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackingEvent {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Order model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub buyer_id: Uuid,
    pub studio_id: Uuid,
    pub items: Json<Vec<OrderItem>>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Option<Json<ShippingAddress>>,
    pub tracking: Option<Json<TrackingInfo>>,
    pub tracking_history: Json<Vec<TrackingEvent>>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    /// Bumped on every write; used for optimistic concurrency
    pub version: i32,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn requires_shipping(&self) -> bool {
        self.items.iter().any(|i| i.item_type.requires_shipping())
    }
}

/// Item line of a new order
#[derive(Debug, Deserialize, Clone)]
pub struct NewOrderItem {
    pub item_type: ItemType,
    pub reference_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

/// Request DTO for placing an order
#[derive(Debug, Deserialize, Clone)]
pub struct CreateOrderRequest {
    pub studio_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
}

impl CreateOrderRequest {
    /// Build the pending, unpaid order; totals are computed here, never trusted from the client
    pub fn into_order(self, buyer_id: Uuid, now: DateTime<Utc>) -> Result<Order, WorkflowError> {
        if self.items.is_empty() {
            return Err(WorkflowError::Validation(
                "an order needs at least one item".to_string(),
            ));
        }
        if self.tax < Decimal::ZERO || self.discount < Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "tax and discount must not be negative".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            if item.name.trim().is_empty() {
                return Err(WorkflowError::Validation("item name is required".to_string()));
            }
            if item.quantity < 1 {
                return Err(WorkflowError::Validation(format!(
                    "quantity of '{}' must be at least 1",
                    item.name
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(WorkflowError::Validation(format!(
                    "unit price of '{}' must not be negative",
                    item.name
                )));
            }
            items.push(OrderItem {
                id: Uuid::new_v4(),
                item_type: item.item_type,
                reference_id: item.reference_id,
                name: item.name.trim().to_string(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                image: item.image,
            });
        }

        let needs_shipping = items.iter().any(|i| i.item_type.requires_shipping());
        let shipping_address = match (needs_shipping, self.shipping_address) {
            (true, None) => {
                return Err(WorkflowError::Validation(
                    "shipping_address is required for physical items".to_string(),
                ))
            }
            (true, Some(address)) => {
                address.check()?;
                Some(Json(address))
            }
            (false, address) => address.map(Json),
        };

        let out_of_range = || WorkflowError::Validation("order total out of range".to_string());
        let subtotal = items.iter().try_fold(Decimal::ZERO, |sum, item| {
            item.line_total().and_then(|line| sum.checked_add(line))
        });
        let subtotal = subtotal.ok_or_else(out_of_range)?;
        let total = subtotal
            .checked_add(self.tax)
            .and_then(|gross| gross.checked_sub(self.discount))
            .ok_or_else(out_of_range)?;
        if total < Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "discount exceeds the order value".to_string(),
            ));
        }

        Ok(Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(now),
            buyer_id,
            studio_id: self.studio_id,
            items: Json(items),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address,
            tracking: None,
            tracking_history: Json(vec![TrackingEvent {
                status: OrderStatus::Pending,
                timestamp: now,
                message: "Order placed".to_string(),
            }]),
            subtotal,
            tax: self.tax,
            discount: self.discount,
            total,
            version: 0,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// `ORD-YYYYMMDD-XXXXXX`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix.to_uppercase())
}

/// Request DTO for PATCH /api/orders/:id
#[derive(Debug, Deserialize, Clone)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub tracking: Option<TrackingInfo>,
    pub message: Option<String>,
}

/// Query parameters for listing orders
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub buyer_id: Option<Uuid>,
    pub studio_id: Option<Uuid>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(item_type: ItemType, price: i64, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            item_type,
            reference_id: Uuid::new_v4(),
            name: "Ceramic mug".to_string(),
            unit_price: Decimal::from(price),
            quantity,
            image: None,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            line1: "12 Analytical Way".to_string(),
            line2: None,
            city: "London".to_string(),
            state: None,
            postal_code: "N1 7AA".to_string(),
            country: "GB".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_totals_computed_server_side() {
        let request = CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![item(ItemType::Product, 12, 2), item(ItemType::Course, 30, 1)],
            shipping_address: Some(address()),
            tax: Decimal::from(5),
            discount: Decimal::from(4),
        };

        let order = request.into_order(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(order.subtotal, Decimal::from(54));
        assert_eq!(order.total, Decimal::from(55));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.tracking_history.len(), 1);
        assert!(order.order_number.starts_with("ORD-"));
    }

    #[test]
    fn test_physical_items_need_address() {
        let request = CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![item(ItemType::Product, 12, 1)],
            shipping_address: None,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
        };
        assert!(matches!(
            request.into_order(Uuid::new_v4(), Utc::now()),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn test_digital_only_order_without_address() {
        let request = CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![item(ItemType::Workshop, 80, 1)],
            shipping_address: None,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
        };
        let order = request.into_order(Uuid::new_v4(), Utc::now()).unwrap();
        assert!(!order.requires_shipping());
        assert!(order.shipping_address.is_none());
    }

    #[test]
    fn test_rejects_zero_quantity_and_excess_discount() {
        let mut request = CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![item(ItemType::Course, 10, 0)],
            shipping_address: None,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
        };
        assert!(request.clone().into_order(Uuid::new_v4(), Utc::now()).is_err());

        request.items = vec![item(ItemType::Course, 10, 1)];
        request.discount = Decimal::from(11);
        assert!(request.into_order(Uuid::new_v4(), Utc::now()).is_err());
    }

    #[test]
    fn test_oversized_amounts_rejected_not_panicking() {
        let huge = |quantity| NewOrderItem {
            unit_price: Decimal::MAX,
            ..item(ItemType::Course, 0, quantity)
        };
        let out_of_range = |result: Result<Order, WorkflowError>| {
            matches!(result, Err(WorkflowError::Validation(msg)) if msg == "order total out of range")
        };

        let mut request = CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![huge(2)],
            shipping_address: None,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
        };
        assert!(out_of_range(request.clone().into_order(Uuid::new_v4(), Utc::now())));

        // each line fits, their sum does not
        request.items = vec![huge(1), huge(1)];
        assert!(out_of_range(request.clone().into_order(Uuid::new_v4(), Utc::now())));

        request.items = vec![huge(1)];
        request.tax = Decimal::ONE;
        assert!(out_of_range(request.into_order(Uuid::new_v4(), Utc::now())));
    }

    #[test]
    fn test_sub_cent_prices_not_rounded() {
        let request = CreateOrderRequest {
            studio_id: Uuid::new_v4(),
            items: vec![NewOrderItem {
                unit_price: Decimal::new(4995, 3),
                ..item(ItemType::Course, 0, 3)
            }],
            shipping_address: None,
            tax: Decimal::new(1, 3),
            discount: Decimal::ZERO,
        };
        let order = request.into_order(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(order.subtotal, Decimal::new(14985, 3));
        assert_eq!(order.total, Decimal::new(14986, 3));
    }

    #[test]
    fn test_tracking_info_normalized() {
        let info = TrackingInfo {
            carrier: " UPS ".to_string(),
            tracking_number: "1Z999".to_string(),
            tracking_url: Some("  ".to_string()),
            estimated_delivery: None,
        };
        let normalized = info.normalized().unwrap();
        assert_eq!(normalized.carrier, "UPS");
        assert_eq!(normalized.tracking_url, None);

        let blank = TrackingInfo {
            carrier: "UPS".to_string(),
            tracking_number: " ".to_string(),
            tracking_url: None,
            estimated_delivery: None,
        };
        assert_eq!(blank.normalized(), Err(WorkflowError::MissingTrackingInfo));
    }
}
