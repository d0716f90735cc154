//! # Upload Cell
//!
//! Multipart file upload with MIME and size validation, disk persistence
//! under a generated server filename, and a public serve route that replays
//! the recorded MIME.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::upload_routes;
