//! # Triage Engine
//!
//! Live patient-vitals simulation for an emergency department dashboard:
//! a population of patients whose vitals drift according to per-patient
//! clinical scenarios, re-evaluated for anomalies every tick and streamed to
//! any number of connected viewers. Alongside it sits an availability-aware
//! doctor roster that incoming cases are assigned to.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌───────────────────┐
//!                 │ SimulationDriver  │  every tick_interval
//!                 └─────────┬─────────┘
//!                           │ tick()
//!                 ┌─────────▼─────────┐      ┌──────────────────┐
//!                 │  PatientRegistry  │─────►│ AnomalyDetector  │
//!                 └─────────┬─────────┘      └──────────────────┘
//!                           │ Snapshot
//!                 ┌─────────▼─────────┐
//!                 │   BroadcastHub    │──► /ws/vitals subscribers
//!                 └───────────────────┘
//!
//!  POST /predict ──► TriageModel ──► AssignmentScheduler ──► DoctorRegistry
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use triage_engine::prelude::*;
//!
//! # async fn example() -> triage_engine::Result<()> {
//! let mut server = TriageServerBuilder::new()
//!     .with_config(TriageConfig::default())
//!     .build()?;
//!
//! server.start().await?;
//! tokio::signal::ctrl_c().await?;
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Simulation
pub mod broadcast;
pub mod detection;
pub mod patient;
pub mod simulation;

// Doctor roster and assignment
pub mod doctor;

// External interfaces
pub mod api;
pub mod collaborators;
pub mod server;

// Re-exports for convenience
pub use config::TriageConfig;
pub use error::{Result, TriageError};
pub use server::{TriageServer, TriageServerBuilder};

/// Common imports for embedding the engine
pub mod prelude {
    pub use crate::broadcast::{BroadcastHub, Subscription};
    pub use crate::collaborators::{
        DatasetPercentiles, PatientFeatures, PopulationStats, Prediction, TriageModel, VitalsRuleModel,
    };
    pub use crate::config::TriageConfig;
    pub use crate::detection::AnomalyDetector;
    pub use crate::doctor::{Assignment, AssignmentScheduler, DoctorRecord, DoctorRegistry, DoctorStatus};
    pub use crate::error::{Result, TriageError};
    pub use crate::patient::{PatientRecord, PatientRegistry, RiskLevel, Scenario, Snapshot, VitalSigns};
    pub use crate::server::{TriageServer, TriageServerBuilder};
    pub use crate::simulation::SimulationDriver;
}
