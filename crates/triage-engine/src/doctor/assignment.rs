//! Assignment scheduler
//!
//! `assign` is a command, not a query: choosing an available doctor for a
//! `High` or `Medium` case marks that doctor `Busy`, so repeated calls
//! progressively consume availability. Calls are not idempotent.
//!
//! Tie-break policy per risk tier:
//!
//! | risk   | available candidates      | none available              |
//! |--------|---------------------------|-----------------------------|
//! | High   | first available           | first candidate (override)  |
//! | Medium | uniform random            | uniform random among all    |
//! | Low    | uniform random            | uniform random among all    |

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::registry::{DoctorRecord, DoctorRegistry, DoctorStatus};
use crate::patient::RiskLevel;

/// Departments consulted when the requested one has no doctors
pub const FALLBACK_DEPARTMENTS: &[&str] = &["General Medicine", "General Practice"];

pub const TRIAGE_NURSE_ID: &str = "nurse_1";
pub const TRIAGE_NURSE_NAME: &str = "Triage Nurse";

/// Outcome of one assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    /// A doctor was chosen; `interrupted` is set when a critical case
    /// overrode a busy doctor because every candidate was busy.
    Doctor {
        doctor: DoctorRecord,
        interrupted: bool,
    },

    /// Nobody on the roster could take the case
    TriageNurse,
}

impl Assignment {
    pub fn id(&self) -> &str {
        match self {
            Assignment::Doctor { doctor, .. } => &doctor.id,
            Assignment::TriageNurse => TRIAGE_NURSE_ID,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Assignment::Doctor { doctor, .. } => &doctor.name,
            Assignment::TriageNurse => TRIAGE_NURSE_NAME,
        }
    }

    pub fn doctor(&self) -> Option<&DoctorRecord> {
        match self {
            Assignment::Doctor { doctor, .. } => Some(doctor),
            Assignment::TriageNurse => None,
        }
    }
}

impl DoctorRegistry {
    /// Assign a doctor for a case, using `rng` for tie-breaks. The whole
    /// read-modify-write runs under one roster lock.
    pub fn assign<R: Rng + ?Sized>(
        &self,
        department: &str,
        risk: RiskLevel,
        rng: &mut R,
    ) -> Assignment {
        let mut roster = self.lock();

        let pool = candidates(&roster, department);
        let Some(index) = select(&roster, &pool, risk, rng) else {
            warn!("No doctor on the roster for {}, routing to {}", department, TRIAGE_NURSE_NAME);
            return Assignment::TriageNurse;
        };

        let doctor = &mut roster[index];
        let available = doctor.is_available();
        let interrupted = risk == RiskLevel::High && !available;
        if interrupted {
            warn!(
                "⚠️ All {} candidates busy, interrupting {} for critical case",
                doctor.department, doctor.name
            );
        } else if !available {
            debug!(
                "All {} candidates busy, {} takes the {} risk case",
                doctor.department, doctor.name, risk
            );
        } else if matches!(risk, RiskLevel::High | RiskLevel::Medium) {
            doctor.status = DoctorStatus::Busy;
        }

        info!(
            "🩺 Assigned {} ({}) to {} risk case in {}",
            doctor.name, doctor.id, risk, doctor.department
        );
        Assignment::Doctor {
            doctor: doctor.clone(),
            interrupted,
        }
    }
}

/// Roster indices for a department, falling back to general practice
fn candidates(roster: &[DoctorRecord], department: &str) -> Vec<usize> {
    let in_department: Vec<usize> = roster
        .iter()
        .enumerate()
        .filter(|(_, d)| d.department == department)
        .map(|(i, _)| i)
        .collect();

    if !in_department.is_empty() {
        return in_department;
    }

    roster
        .iter()
        .enumerate()
        .filter(|(_, d)| FALLBACK_DEPARTMENTS.contains(&d.department.as_str()))
        .map(|(i, _)| i)
        .collect()
}

fn select<R: Rng + ?Sized>(
    roster: &[DoctorRecord],
    candidates: &[usize],
    risk: RiskLevel,
    rng: &mut R,
) -> Option<usize> {
    let available: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| roster[i].is_available())
        .collect();

    match risk {
        RiskLevel::High => available.first().or(candidates.first()).copied(),
        RiskLevel::Medium | RiskLevel::Low => available
            .choose(rng)
            .or_else(|| candidates.choose(rng))
            .copied(),
    }
}

/// Owns the tie-break random source for request handlers
pub struct AssignmentScheduler {
    doctors: Arc<DoctorRegistry>,
    rng: Mutex<StdRng>,
}

impl AssignmentScheduler {
    /// A `seed` makes tie-breaks reproducible
    pub fn new(doctors: Arc<DoctorRegistry>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            doctors,
            rng: Mutex::new(rng),
        }
    }

    pub fn doctors(&self) -> &Arc<DoctorRegistry> {
        &self.doctors
    }

    pub fn assign(&self, department: &str, risk: RiskLevel) -> Assignment {
        let mut rng = self.rng.lock();
        self.doctors.assign(department, risk, &mut *rng)
    }
}
