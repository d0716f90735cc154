pub mod booking;
pub mod consultation;
pub mod prescription;

pub use booking::AppointmentBookingService;
pub use consultation::ConsultationService;
pub use prescription::PrescriptionService;
