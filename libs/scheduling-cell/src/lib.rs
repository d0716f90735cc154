//! # Scheduling Cell
//!
//! Appointment booking, prescriptions, and consultation sessions.
//!
//! Booking holds the no-double-booking rule for a doctor: an exact-slot
//! precheck gives callers a friendly conflict message, and the store's unique
//! constraint on `(doctor_user_id, scheduled_at)` closes the race between
//! concurrent requests. A successful booking also files a companion reminder
//! one hour before the slot.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::scheduling_routes;
