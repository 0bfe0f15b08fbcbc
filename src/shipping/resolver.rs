//! Shipping rate resolution
//!
//! Pure lookup over an already-loaded zone table. Zone selection prefers the
//! most specific geographic match (state > country > worldwide), falls back to
//! the default zone, and then filters the zone's rates against the package.
//! Tier bounds are half-open, `[min_bound, max_bound)`, so adjacent tiers never
//! both apply.

use rust_decimal::Decimal;

use super::model::{Destination, Package, RateType, Resolution, ResolvedRate, ShippingRate, ShippingZone};
use crate::workflow::WorkflowError;

/// How closely a zone matches a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Specificity {
    Worldwide,
    Country,
    State,
}

pub struct ShippingRateResolver<'a> {
    zones: &'a [ShippingZone],
}

impl<'a> ShippingRateResolver<'a> {
    /// `zones` must already be in display order; ties resolve to the earlier zone.
    pub fn new(zones: &'a [ShippingZone]) -> Self {
        Self { zones }
    }

    pub fn resolve(
        &self,
        destination: &Destination,
        package: &Package,
    ) -> Result<Resolution, WorkflowError> {
        if package.weight < Decimal::ZERO || package.price < Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "package weight and price must not be negative".to_string(),
            ));
        }

        let zone = self.select_zone(destination)?;

        let rates: Vec<ResolvedRate> = zone
            .rates
            .iter()
            .filter_map(|rate| {
                rate.quote(package).map(|amount| ResolvedRate {
                    rate_id: rate.id,
                    name: rate.name.clone(),
                    rate_type: rate.rate_type,
                    amount,
                    min_days: rate.min_days,
                    max_days: rate.max_days,
                })
            })
            .collect();

        if rates.is_empty() {
            tracing::debug!(zone = %zone.name, "No rate bounds include the package");
            return Err(WorkflowError::NoRateApplicable {
                zone: zone.name.clone(),
            });
        }

        Ok(Resolution {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
            rates,
        })
    }

    /// Pick the zone serving `destination`
    pub fn select_zone(&self, destination: &Destination) -> Result<&'a ShippingZone, WorkflowError> {
        let country = destination.country.trim().to_uppercase();
        if country.is_empty() {
            return Err(WorkflowError::Validation(
                "destination country is required".to_string(),
            ));
        }
        let state = destination
            .state
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());

        let mut best: Option<(Specificity, &'a ShippingZone)> = None;
        for zone in self.zones.iter().filter(|z| z.is_active) {
            if let Some(spec) = specificity(zone, &country, state.as_deref()) {
                // strict comparison keeps the earliest zone on ties
                if best.map_or(true, |(current, _)| spec > current) {
                    best = Some((spec, zone));
                }
            }
        }

        if let Some((_, zone)) = best {
            return Ok(zone);
        }

        self.zones
            .iter()
            .find(|z| z.is_active && z.is_default)
            .ok_or(WorkflowError::NoZoneFound)
    }
}

fn specificity(zone: &ShippingZone, country: &str, state: Option<&str>) -> Option<Specificity> {
    if zone.countries.is_empty() {
        return Some(Specificity::Worldwide);
    }
    if !zone.countries.iter().any(|c| c.eq_ignore_ascii_case(country)) {
        return None;
    }
    if zone.states.is_empty() {
        return Some(Specificity::Country);
    }
    match state {
        Some(state) if zone.states.iter().any(|s| s.eq_ignore_ascii_case(state)) => {
            Some(Specificity::State)
        }
        _ => None,
    }
}

impl ShippingRate {
    /// Price of this rate for `package`, or `None` when its tier excludes it
    pub fn quote(&self, package: &Package) -> Option<Decimal> {
        match self.rate_type {
            RateType::Flat => Some(self.amount),
            RateType::Free => Some(Decimal::ZERO),
            RateType::WeightBased => self.within_bounds(package.weight).then_some(self.amount),
            RateType::PriceBased => self.within_bounds(package.price).then_some(self.amount),
        }
    }

    fn within_bounds(&self, value: Decimal) -> bool {
        self.min_bound.map_or(true, |min| value >= min) && self.max_bound.map_or(true, |max| value < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn rate(rate_type: RateType, amount: i64, bounds: (Option<i64>, Option<i64>)) -> ShippingRate {
        ShippingRate {
            id: Uuid::new_v4(),
            zone_id: Uuid::nil(),
            name: format!("{:?}", rate_type),
            rate_type,
            amount: Decimal::from(amount),
            min_days: 1,
            max_days: 3,
            min_bound: bounds.0.map(Decimal::from),
            max_bound: bounds.1.map(Decimal::from),
            position: 0,
        }
    }

    fn zone(name: &str, countries: &[&str], states: &[&str], rates: Vec<ShippingRate>) -> ShippingZone {
        ShippingZone {
            id: Uuid::new_v4(),
            name: name.to_string(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
            states: states.iter().map(|s| s.to_string()).collect(),
            rates,
            is_active: true,
            is_default: false,
            position: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn package(weight: i64, price: i64) -> Package {
        Package {
            weight: Decimal::from(weight),
            price: Decimal::from(price),
        }
    }

    fn to(country: &str, state: Option<&str>) -> Destination {
        Destination {
            country: country.to_string(),
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn test_state_zone_beats_country_zone() {
        let zones = vec![
            zone("US", &["US"], &[], vec![rate(RateType::Flat, 5, (None, None))]),
            zone("California", &["US"], &["CA"], vec![rate(RateType::Flat, 7, (None, None))]),
        ];
        let resolver = ShippingRateResolver::new(&zones);

        let resolution = resolver.resolve(&to("us", Some("ca")), &package(1, 10)).unwrap();
        assert_eq!(resolution.zone_name, "California");

        let resolution = resolver.resolve(&to("US", Some("NY")), &package(1, 10)).unwrap();
        assert_eq!(resolution.zone_name, "US");
    }

    #[test]
    fn test_inactive_zones_are_skipped() {
        let mut us = zone("US", &["US"], &[], vec![rate(RateType::Flat, 5, (None, None))]);
        us.is_active = false;
        let zones = vec![us];
        let err = ShippingRateResolver::new(&zones)
            .resolve(&to("US", None), &package(1, 1))
            .unwrap_err();
        assert_eq!(err, WorkflowError::NoZoneFound);
    }

    #[test]
    fn test_default_zone_with_countries_is_fallback() {
        let mut fallback = zone("Rest", &["DE"], &[], vec![rate(RateType::Flat, 20, (None, None))]);
        fallback.is_default = true;
        let zones = vec![zone("US", &["US"], &[], vec![rate(RateType::Flat, 5, (None, None))]), fallback];

        let resolution = ShippingRateResolver::new(&zones)
            .resolve(&to("JP", None), &package(1, 1))
            .unwrap();
        assert_eq!(resolution.zone_name, "Rest");
    }

    #[test]
    fn test_price_tier_and_free_rate() {
        let zones = vec![zone(
            "US",
            &["US"],
            &[],
            vec![
                rate(RateType::PriceBased, 9, (None, Some(50))),
                rate(RateType::Free, 0, (None, None)),
            ],
        )];
        let resolver = ShippingRateResolver::new(&zones);

        let cheap = resolver.resolve(&to("US", None), &package(1, 20)).unwrap();
        assert_eq!(cheap.rates.len(), 2);
        assert_eq!(cheap.cheapest().map(|r| r.amount), Some(Decimal::ZERO));

        let expensive = resolver.resolve(&to("US", None), &package(1, 50)).unwrap();
        assert_eq!(expensive.rates.len(), 1);
        assert_eq!(expensive.rates[0].rate_type, RateType::Free);
    }

    #[test]
    fn test_no_rate_applicable() {
        let zones = vec![zone("US", &["US"], &[], vec![rate(RateType::WeightBased, 5, (Some(0), Some(5)))])];
        let err = ShippingRateResolver::new(&zones)
            .resolve(&to("US", None), &package(9, 1))
            .unwrap_err();
        assert_eq!(err, WorkflowError::NoRateApplicable { zone: "US".to_string() });
    }

    #[test]
    fn test_negative_package_rejected() {
        let zones = vec![zone("World", &[], &[], vec![rate(RateType::Flat, 5, (None, None))])];
        let err = ShippingRateResolver::new(&zones)
            .resolve(&to("US", None), &package(-1, 1))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
