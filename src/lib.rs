//! Studiomart marketplace workflow server
//!
//! Order lifecycle, shipping-rate resolution, returns, support tickets,
//! review moderation and studio KYC behind a JSON API.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod kyc;
pub mod middleware;
pub mod models;
pub mod order;
pub mod returns;
pub mod review;
pub mod routes;
pub mod shipping;
pub mod state;
pub mod support;
pub mod websocket;
pub mod workflow;
