//! HTTP middleware: request tracing, security headers and the
//! authentication extractors.

pub mod auth;
mod security;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, OptionalUser};
pub use security::{hsts_header, security_headers};
pub use tracing::request_tracing;
