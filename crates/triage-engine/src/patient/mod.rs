//! # Patient Registry
//!
//! Patient records, the clinical scenario model that drifts their vitals, and
//! the shared registry the simulation driver mutates once per tick.
//!
//! ```text
//! dataset.json ──┐
//!                ├──► PatientRegistry ──tick()──► Snapshot ──► BroadcastHub
//! seed (synthetic)┘        ▲
//!                          └── Scenario::drift + AnomalyDetector per record
//! ```

pub mod dataset;
pub mod record;
pub mod registry;
pub mod scenario;
pub mod seed;
pub mod vitals;

pub use record::{PatientRecord, DEFAULT_HISTORY_CAPACITY};
pub use registry::{PatientRegistry, Snapshot, TickReport};
pub use scenario::Scenario;
pub use vitals::{Gender, RiskLevel, VitalSigns};
