//! Shipping domain module
//!
//! Contains zone/rate models, the rate resolver and the zone service.

mod model;
mod resolver;
mod service;

pub use model::*;
pub use resolver::ShippingRateResolver;
pub use service::ShippingService;
