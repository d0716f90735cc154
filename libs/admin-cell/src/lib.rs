//! # Admin Cell
//!
//! Read-only aggregate counts for the admin dashboard.

pub mod handlers;
pub mod router;

pub use router::admin_routes;
