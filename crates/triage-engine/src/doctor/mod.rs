//! # Doctor Registry
//!
//! The doctor roster and the scheduler that assigns incoming cases to it.

pub mod assignment;
pub mod registry;

pub use assignment::{Assignment, AssignmentScheduler, FALLBACK_DEPARTMENTS};
pub use registry::{default_roster, DepartmentStats, DoctorRecord, DoctorRegistry, DoctorStatus};
