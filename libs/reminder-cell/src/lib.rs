//! # Reminder Cell
//!
//! User-set reminders plus the periodic dispatcher that delivers due ones.
//!
//! The dispatcher is a single spawned task per process; the guarded
//! `sent=eq.false` mark acts as the claim when more than one process sweeps
//! the same table.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::reminder_routes;
pub use services::ReminderDispatcher;
