//! API handlers

pub mod audit;
pub mod health;
pub mod kyc;
pub mod order;
pub mod returns;
pub mod review;
pub mod shipping;
pub mod support;

pub use audit::*;
pub use health::*;
pub use kyc::*;
pub use order::*;
pub use returns::*;
pub use review::*;
pub use shipping::*;
pub use support::*;
