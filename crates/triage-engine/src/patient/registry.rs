use std::sync::Arc;

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::record::PatientRecord;
use crate::detection::AnomalyDetector;
use crate::error::Result;

/// Registry state at one tick boundary, frozen for transmission.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Tick that produced this state (0 = not yet simulated)
    pub tick: u64,
    pub patients: Arc<Vec<PatientRecord>>,
}

impl Snapshot {
    /// Wire form: a JSON array of patient records
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self.patients.as_slice())?)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }
}

/// Outcome of one registry pass
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    /// Patients with at least one anomaly this tick
    pub flagged: usize,
    pub snapshot: Snapshot,
}

struct RegistryState {
    patients: Vec<PatientRecord>,
    tick: u64,
}

/// Shared patient registry
///
/// The lock is held for exactly one pass (a tick or a read) and never across
/// an `.await`; subscribers receive frozen [`Snapshot`]s instead of guards.
pub struct PatientRegistry {
    state: RwLock<RegistryState>,
    detector: AnomalyDetector,
    history_capacity: usize,
}

impl PatientRegistry {
    /// Create a registry over an initial population
    pub fn new(patients: Vec<PatientRecord>, history_capacity: usize) -> Self {
        Self::with_detector(patients, history_capacity, AnomalyDetector::default())
    }

    pub fn with_detector(
        patients: Vec<PatientRecord>,
        history_capacity: usize,
        detector: AnomalyDetector,
    ) -> Self {
        Self {
            state: RwLock::new(RegistryState { patients, tick: 0 }),
            detector,
            history_capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Number of completed ticks
    pub fn tick_count(&self) -> u64 {
        self.state.read().tick
    }

    /// Full current state
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            tick: state.tick,
            patients: Arc::new(state.patients.clone()),
        }
    }

    /// First `limit` records, for point-in-time inspection
    pub fn first(&self, limit: usize) -> Vec<PatientRecord> {
        self.state.read().patients.iter().take(limit).cloned().collect()
    }

    /// Look up one patient by identifier
    pub fn get(&self, id: &str) -> Option<PatientRecord> {
        self.state.read().patients.iter().find(|p| p.id == id).cloned()
    }

    /// Mutate one patient under the write lock
    pub fn with_patient_mut<T>(&self, id: &str, f: impl FnOnce(&mut PatientRecord) -> T) -> Option<T> {
        let mut state = self.state.write();
        state.patients.iter_mut().find(|p| p.id == id).map(f)
    }

    /// Advance every patient by one tick and freeze the result, all under a
    /// single write-lock pass. The pass works on a copy that replaces the
    /// stored records only once every patient has advanced, so a tick that
    /// unwinds part way leaves the registry as it was.
    pub fn tick<R: Rng + ?Sized>(&self, rng: &mut R) -> TickReport {
        let mut state = self.state.write();
        let mut patients = state.patients.clone();
        let mut flagged = 0;

        for patient in patients.iter_mut() {
            if patient.tick(rng, &self.detector, self.history_capacity) > 0 {
                flagged += 1;
            }
        }

        let frozen = Arc::new(patients.clone());
        state.patients = patients;
        state.tick += 1;
        let tick = state.tick;
        let snapshot = Snapshot {
            tick,
            patients: frozen,
        };
        drop(state);

        debug!("tick {}: {} patients, {} flagged", tick, snapshot.len(), flagged);
        TickReport { tick, flagged, snapshot }
    }

    /// Clone a random existing patient as a simulated new arrival. The
    /// registry itself is not modified.
    pub fn synthetic_arrival<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PatientRecord> {
        let state = self.state.read();
        state.patients.choose(rng).map(|p| p.as_new_arrival(rng))
    }
}
