//! Shipping zones, rates and resolution DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::workflow::WorkflowError;

/// How a rate's amount is determined
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "shipping_rate_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    Flat,
    WeightBased,
    PriceBased,
    Free,
}

impl RateType {
    /// Tiered rates carry optional `[min_bound, max_bound)` limits
    pub fn is_tiered(self) -> bool {
        matches!(self, RateType::WeightBased | RateType::PriceBased)
    }
}

/// A single rate row inside a zone
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ShippingRate {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub name: String,
    pub rate_type: RateType,
    pub amount: Decimal,
    pub min_days: i32,
    pub max_days: i32,
    pub min_bound: Option<Decimal>,
    pub max_bound: Option<Decimal>,
    pub position: i32,
}

/// Zone row as stored; rates live in their own table
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ShippingZoneRow {
    pub id: Uuid,
    pub name: String,
    pub countries: Vec<String>,
    pub states: Vec<String>,
    pub is_active: bool,
    pub is_default: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Zone together with its ordered rate table
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShippingZone {
    pub id: Uuid,
    pub name: String,
    /// ISO country codes; empty means worldwide
    pub countries: Vec<String>,
    /// Optional state/province refinement
    pub states: Vec<String>,
    pub rates: Vec<ShippingRate>,
    pub is_active: bool,
    pub is_default: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShippingZone {
    pub fn from_row(row: ShippingZoneRow, rates: Vec<ShippingRate>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            countries: row.countries,
            states: row.states,
            rates,
            is_active: row.is_active,
            is_default: row.is_default,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Request DTO for creating or replacing a zone
#[derive(Debug, Deserialize, Validate)]
pub struct ZoneRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub position: i32,
    pub rates: Vec<RateRequest>,
}

fn default_true() -> bool {
    true
}

impl ZoneRequest {
    /// Cross-field rules the derive cannot express
    pub fn check_rules(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Validation("zone name is required".to_string()));
        }
        if self.countries.iter().any(|c| c.trim().is_empty()) {
            return Err(WorkflowError::Validation(
                "country codes must not be blank".to_string(),
            ));
        }
        if !self.states.is_empty() && self.countries.is_empty() {
            return Err(WorkflowError::Validation(
                "state refinement requires at least one country".to_string(),
            ));
        }
        if self.rates.is_empty() {
            return Err(WorkflowError::Validation(
                "a zone needs at least one rate".to_string(),
            ));
        }
        for rate in &self.rates {
            rate.check_rules()?;
        }
        Ok(())
    }

    /// Country and state codes are compared upper-cased
    pub fn normalized_countries(&self) -> Vec<String> {
        normalize_codes(&self.countries)
    }

    pub fn normalized_states(&self) -> Vec<String> {
        normalize_codes(&self.states)
    }
}

pub(crate) fn normalize_codes(codes: &[String]) -> Vec<String> {
    codes.iter().map(|c| c.trim().to_uppercase()).collect()
}

/// Rate entry inside a [`ZoneRequest`]
#[derive(Debug, Deserialize, Clone)]
pub struct RateRequest {
    pub name: String,
    pub rate_type: RateType,
    pub amount: Decimal,
    pub min_days: i32,
    pub max_days: i32,
    pub min_bound: Option<Decimal>,
    pub max_bound: Option<Decimal>,
}

impl RateRequest {
    pub fn check_rules(&self) -> Result<(), WorkflowError> {
        let invalid = |msg: &str| -> Result<(), WorkflowError> {
            Err(WorkflowError::Validation(format!(
                "rate '{}': {}",
                self.name, msg
            )))
        };

        if self.name.trim().is_empty() {
            return Err(WorkflowError::Validation("rate name is required".to_string()));
        }
        if self.amount < Decimal::ZERO {
            return invalid("amount must not be negative");
        }
        if self.rate_type == RateType::Free && !self.amount.is_zero() {
            return invalid("free rates must have a zero amount");
        }
        if self.min_days < 0 || self.max_days < self.min_days {
            return invalid("delivery days must satisfy 0 <= min_days <= max_days");
        }
        if !self.rate_type.is_tiered() && (self.min_bound.is_some() || self.max_bound.is_some()) {
            return invalid("only weight or price based rates take bounds");
        }
        if let (Some(min), Some(max)) = (self.min_bound, self.max_bound) {
            if max <= min {
                return invalid("max_bound must be greater than min_bound");
            }
        }
        if self.min_bound.map_or(false, |b| b < Decimal::ZERO) {
            return invalid("min_bound must not be negative");
        }
        Ok(())
    }
}

/// Where the parcel goes
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Destination {
    pub country: String,
    pub state: Option<String>,
}

/// What is being shipped
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct Package {
    /// Weight in the store's configured unit
    pub weight: Decimal,
    /// Merchandise value used by price tiers
    pub price: Decimal,
}

/// Request DTO for POST /api/shipping/resolve
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub destination: Destination,
    pub package: Package,
}

/// One applicable rate in a resolution
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ResolvedRate {
    pub rate_id: Uuid,
    pub name: String,
    pub rate_type: RateType,
    pub amount: Decimal,
    pub min_days: i32,
    pub max_days: i32,
}

/// Applicable rates of the selected zone, in zone order
#[derive(Debug, Serialize, Clone)]
pub struct Resolution {
    pub zone_id: Uuid,
    pub zone_name: String,
    pub rates: Vec<ResolvedRate>,
}

impl Resolution {
    /// Convenience for callers that want the lowest price
    pub fn cheapest(&self) -> Option<&ResolvedRate> {
        self.rates.iter().min_by(|a, b| a.amount.cmp(&b.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(rate_type: RateType, amount: i64) -> RateRequest {
        RateRequest {
            name: "Standard".to_string(),
            rate_type,
            amount: Decimal::from(amount),
            min_days: 2,
            max_days: 5,
            min_bound: None,
            max_bound: None,
        }
    }

    #[test]
    fn test_free_rate_requires_zero_amount() {
        assert!(rate(RateType::Free, 0).check_rules().is_ok());
        assert!(matches!(
            rate(RateType::Free, 3).check_rules(),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut tier = rate(RateType::WeightBased, 8);
        tier.min_bound = Some(Decimal::from(5));
        tier.max_bound = Some(Decimal::from(5));
        assert!(tier.check_rules().is_err());

        tier.max_bound = Some(Decimal::from(10));
        assert!(tier.check_rules().is_ok());
    }

    #[test]
    fn test_flat_rate_rejects_bounds() {
        let mut flat = rate(RateType::Flat, 5);
        flat.max_bound = Some(Decimal::from(1));
        assert!(flat.check_rules().is_err());
    }

    #[test]
    fn test_delivery_day_range() {
        let mut flat = rate(RateType::Flat, 5);
        flat.min_days = 6;
        assert!(flat.check_rules().is_err());
    }

    fn zone(rates: Vec<RateRequest>) -> ZoneRequest {
        ZoneRequest {
            name: "Domestic".to_string(),
            countries: vec!["US".to_string()],
            states: vec![],
            is_active: true,
            is_default: false,
            position: 0,
            rates,
        }
    }

    #[test]
    fn test_zone_without_rates_rejected() {
        assert!(matches!(
            zone(vec![]).check_rules(),
            Err(WorkflowError::Validation(msg)) if msg.contains("at least one rate")
        ));
        assert!(zone(vec![rate(RateType::Flat, 5)]).check_rules().is_ok());
    }

    #[test]
    fn test_sub_cent_amounts_kept_exact() {
        let mut tier = rate(RateType::WeightBased, 0);
        tier.amount = Decimal::new(4995, 3);
        tier.min_bound = Some(Decimal::new(5, 4));
        assert!(tier.check_rules().is_ok());
        assert_eq!(tier.amount.to_string(), "4.995");
    }

    #[test]
    fn test_normalize_codes() {
        let codes = vec![" us".to_string(), "ca ".to_string()];
        assert_eq!(normalize_codes(&codes), vec!["US", "CA"]);
    }
}
