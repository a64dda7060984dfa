//! HTTP surface for the NFL schedule
//!
//! Serves a passthrough echo route, stored games per week, and a health check.

pub mod rest_api;

pub use rest_api::create_routes;
