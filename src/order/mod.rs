//! Order domain module
//!
//! Order placement, the order status machine with its tracking history, and
//! the persistence service.

mod machine;
mod model;
mod service;

pub use machine::OrderStatusMachine;
pub use model::*;
pub use service::OrderService;
