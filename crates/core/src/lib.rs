pub mod attendance;
pub mod config;
pub mod domain;

pub use attendance::{record_sign_in, AttendanceStore, SignInOutcome, StoreError};
pub use domain::{AttendanceRecord, UserProfile, WorkLocation};
