//! Domain services for the tutoring-center tracker.
//!
//! Pure calendar/billing logic lives in [`billing`] and [`schedule`];
//! [`attendance`] owns the draft-staging state machine; the two
//! `*_service` modules orchestrate storage for the REST layer.

pub mod attendance;
pub mod attendance_service;
pub mod billing;
pub mod schedule;
pub mod student_service;

pub use attendance::{DraftError, SessionDraftAggregator};
pub use attendance_service::AttendanceService;
pub use billing::BillingEngine;
pub use student_service::StudentService;
