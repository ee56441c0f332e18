use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TriageError};

/// Doctor availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoctorStatus {
    #[default]
    Available,
    Busy,
}

impl FromStr for DoctorStatus {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "available" | "Available" => Ok(DoctorStatus::Available),
            "busy" | "Busy" => Ok(DoctorStatus::Busy),
            other => Err(TriageError::invalid_input(format!(
                "Unknown doctor status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorStatus::Available => write!(f, "Available"),
            DoctorStatus::Busy => write!(f, "Busy"),
        }
    }
}

/// A doctor on the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "dept")]
    pub department: String,
    pub status: DoctorStatus,
    #[serde(rename = "spec")]
    pub specialty: String,
}

impl DoctorRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
        status: DoctorStatus,
        specialty: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department: department.into(),
            status,
            specialty: specialty.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == DoctorStatus::Available
    }
}

/// Availability summary for one department
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepartmentStats {
    pub total: usize,
    pub available: usize,
    /// Distinct specialties, sorted
    pub specs: Vec<String>,
}

/// The roster the hospital starts every run with.
pub fn default_roster() -> Vec<DoctorRecord> {
    use DoctorStatus::{Available, Busy};

    [
        ("cardio_1", "Dr. Heart", "Cardiology", Available, "Interventional Cardiology"),
        ("cardio_2", "Dr. Pulse", "Cardiology", Busy, "Electrophysiology"),
        ("cardio_3", "Dr. Vein", "Cardiology", Available, "Vascular Surgery"),
        ("neuro_1", "Dr. Brain", "Neurology", Available, "Stroke Specialist"),
        ("neuro_2", "Dr. Nerve", "Neurology", Busy, "Neuromuscular"),
        ("neuro_3", "Dr. Mind", "Neurology", Available, "Neuro-Oncology"),
        ("pulmo_1", "Dr. Lung", "Pulmonology", Available, "Pulmonary Critical Care"),
        ("pulmo_2", "Dr. Breath", "Pulmonology", Available, "Asthma Specialist"),
        ("gen_1", "Dr. Care", "General Medicine", Available, "Internal Medicine"),
        ("gen_2", "Dr. Heal", "General Medicine", Busy, "Internal Medicine"),
        ("gen_3", "Dr. Helper", "General Medicine", Available, "Internal Medicine"),
        ("ortho_1", "Dr. Bone", "Orthopedics", Available, "Trauma Surgery"),
        ("ortho_2", "Dr. Joint", "Orthopedics", Available, "Joint Replacement"),
        ("gastro_1", "Dr. Stomach", "Gastroenterology", Available, "Hepatology"),
        ("gastro_2", "Dr. Gut", "Gastroenterology", Busy, "IBD Specialist"),
        ("derma_1", "Dr. Skin", "Dermatology", Available, "Dermatopathology"),
        ("gen_4", "Dr. Harper", "General Medicine", Available, "Senior Consultant"),
        ("gp_1", "Dr. General", "General Medicine", Available, "Family Medicine"),
        ("gp_2", "Dr. Smith", "General Medicine", Available, "Family Medicine"),
    ]
    .into_iter()
    .map(|(id, name, dept, status, spec)| DoctorRecord::new(id, name, dept, status, spec))
    .collect()
}

/// Shared doctor roster
///
/// Doctors are never added or removed at runtime; only their status changes.
pub struct DoctorRegistry {
    roster: Mutex<Vec<DoctorRecord>>,
}

impl DoctorRegistry {
    pub fn new(roster: Vec<DoctorRecord>) -> Self {
        Self {
            roster: Mutex::new(roster),
        }
    }

    pub fn with_default_roster() -> Self {
        Self::new(default_roster())
    }

    pub fn len(&self) -> usize {
        self.roster.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the whole roster in seeding order
    pub fn list(&self) -> Vec<DoctorRecord> {
        self.roster.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<DoctorRecord> {
        self.roster.lock().iter().find(|d| d.id == id).cloned()
    }

    /// Doctors grouped by department
    pub fn grouped(&self) -> BTreeMap<String, Vec<DoctorRecord>> {
        let mut grouped: BTreeMap<String, Vec<DoctorRecord>> = BTreeMap::new();
        for doctor in self.roster.lock().iter() {
            grouped
                .entry(doctor.department.clone())
                .or_default()
                .push(doctor.clone());
        }
        grouped
    }

    /// Total vs. available per department, plus distinct specialties
    pub fn department_stats(&self) -> BTreeMap<String, DepartmentStats> {
        let mut stats: BTreeMap<String, (DepartmentStats, BTreeSet<String>)> = BTreeMap::new();

        for doctor in self.roster.lock().iter() {
            let (entry, specs) = stats.entry(doctor.department.clone()).or_default();
            entry.total += 1;
            if doctor.is_available() {
                entry.available += 1;
            }
            specs.insert(doctor.specialty.clone());
        }

        stats
            .into_iter()
            .map(|(dept, (mut entry, specs))| {
                entry.specs = specs.into_iter().collect();
                (dept, entry)
            })
            .collect()
    }

    /// Set a named doctor's status
    pub fn set_status(&self, name: &str, status: DoctorStatus) -> Result<DoctorStatus> {
        let mut roster = self.roster.lock();
        let doctor = roster
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| TriageError::not_found("Doctor not found"))?;

        doctor.status = status;
        info!("🔄 {} ({}) is now {}", doctor.name, doctor.id, status);
        Ok(status)
    }

    /// Mark every doctor available
    pub fn reset(&self) {
        for doctor in self.roster.lock().iter_mut() {
            doctor.status = DoctorStatus::Available;
        }
        info!("🔄 All doctors reset to Available");
    }

    /// Exclusive access for read-modify-write commands such as assignment
    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<DoctorRecord>> {
        self.roster.lock()
    }
}

impl Default for DoctorRegistry {
    fn default() -> Self {
        Self::with_default_roster()
    }
}
