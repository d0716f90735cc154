pub mod account;
pub mod otp;

pub use account::AccountService;
pub use otp::{generate_code, InMemoryOtpStore, OtpEntry, OtpStore, OTP_TTL_SECONDS};
