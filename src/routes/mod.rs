//! Route definitions

mod audit;
mod kyc;
mod order;
mod returns;
mod review;
mod shipping;
mod support;

pub use audit::audit_routes;
pub use kyc::kyc_routes;
pub use order::order_routes;
pub use returns::return_routes;
pub use review::review_routes;
pub use shipping::shipping_routes;
pub use support::support_routes;
