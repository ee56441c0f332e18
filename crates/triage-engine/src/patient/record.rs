use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scenario::Scenario;
use super::vitals::{Gender, RiskLevel, VitalSigns};
use crate::detection::AnomalyDetector;

/// Default number of past samples kept per patient.
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

const FIRST_NAMES: &[&str] = &["John", "Jane", "Alex", "Sam", "Chris", "Taylor", "Jordan", "Casey"];
const LAST_NAMES: &[&str] = &["Smith", "Doe", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller"];

/// A monitored patient as streamed to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "Patient_ID")]
    pub id: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Age")]
    pub age: u32,

    #[serde(rename = "Gender")]
    pub gender: Gender,

    #[serde(rename = "Symptoms")]
    pub symptoms: String,

    #[serde(flatten)]
    pub vitals: VitalSigns,

    #[serde(rename = "Chronic_Conditions")]
    pub chronic_conditions: String,

    #[serde(rename = "Medical_Notes", default)]
    pub medical_notes: String,

    #[serde(rename = "Department", default)]
    pub department: String,

    /// Assigned on the first tick, never changed afterwards
    #[serde(default)]
    pub scenario: Option<Scenario>,

    /// Pre-tick samples, oldest first
    #[serde(default)]
    pub history: VecDeque<VitalSigns>,

    #[serde(rename = "Risk_Level")]
    pub risk_level: RiskLevel,

    #[serde(default)]
    pub explanation: Vec<String>,

    /// Risk the patient was admitted with; restored on ticks without anomalies
    #[serde(skip)]
    pub baseline_risk: RiskLevel,
}

impl PatientRecord {
    /// Create a record with the given demographics and vitals
    pub fn new(id: impl Into<String>, name: impl Into<String>, vitals: VitalSigns) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age: 0,
            gender: Gender::default(),
            symptoms: String::new(),
            vitals,
            chronic_conditions: "None".to_string(),
            medical_notes: String::new(),
            department: String::new(),
            scenario: None,
            history: VecDeque::new(),
            risk_level: RiskLevel::Low,
            explanation: Vec::new(),
            baseline_risk: RiskLevel::Low,
        }
    }

    /// Set the admission risk (also the current risk)
    pub fn with_baseline_risk(mut self, risk: RiskLevel) -> Self {
        self.baseline_risk = risk;
        self.risk_level = risk;
        self
    }

    /// Run one simulation step: assign a scenario if absent, drift the vitals
    /// and re-evaluate anomalies. Returns the number of anomalies raised.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        detector: &AnomalyDetector,
        history_capacity: usize,
    ) -> usize {
        let scenario = *self.scenario.get_or_insert_with(|| Scenario::pick(rng));
        let next = scenario.drift(&self.vitals, rng);
        self.advance(next, detector, history_capacity)
    }

    /// Record the current vitals in history, replace them with `next` and
    /// apply the detector. History always holds pre-tick state, so the trend
    /// rules compare `next` against the sample it drifted from.
    pub fn advance(
        &mut self,
        next: VitalSigns,
        detector: &AnomalyDetector,
        history_capacity: usize,
    ) -> usize {
        self.push_history(history_capacity);
        self.vitals = next;

        let anomalies = detector.detect(&self.vitals, self.history.make_contiguous());
        let count = anomalies.len();
        self.apply_detection(anomalies);
        count
    }

    /// Overwrite risk and explanation from one detector run. Any anomaly
    /// forces `High` regardless of scenario; otherwise the admission risk
    /// is restored.
    pub fn apply_detection(&mut self, anomalies: Vec<String>) {
        self.risk_level = if anomalies.is_empty() {
            self.baseline_risk
        } else {
            RiskLevel::High
        };
        self.explanation = anomalies;
    }

    fn push_history(&mut self, capacity: usize) {
        self.history.push_back(self.vitals);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }

    /// Copy of this record presented as a new arrival: fresh identifier,
    /// freshly composed name, empty history.
    pub fn as_new_arrival<R: Rng + ?Sized>(&self, rng: &mut R) -> PatientRecord {
        let mut arrival = self.clone();
        arrival.id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string();
        arrival.name = random_name(rng);
        arrival.history.clear();
        arrival
    }
}

/// Compose a display name from the arrival name pools
pub fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("John");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");
    format!("{} {}", first, last)
}

/// Fresh opaque patient identifier
pub fn new_patient_id() -> String {
    Uuid::new_v4().to_string()
}
