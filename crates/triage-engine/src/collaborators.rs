//! # Collaborators
//!
//! Interfaces to the services the prediction endpoint consults: a triage
//! classifier and population statistics. They are called from request
//! handlers only, never from the simulation driver.
//!
//! Also hosts the symptom keyword safety net that overrides the classifier's
//! department (and, for the critical groups, its risk).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::patient::{PatientRecord, RiskLevel, VitalSigns};

/// Clinical features submitted for a triage prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientFeatures {
    #[serde(rename = "Age")]
    pub age: u32,

    #[serde(rename = "Gender")]
    pub gender: String,

    #[serde(flatten)]
    pub vitals: VitalSigns,

    #[serde(rename = "Symptoms", default)]
    pub symptoms: String,

    #[serde(rename = "Medical_Notes", default)]
    pub medical_notes: String,

    #[serde(rename = "Pre_Existing_Conditions", default)]
    pub pre_existing_conditions: String,
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub risk: RiskLevel,
    pub department: String,
    /// Confidence in the risk label, 0-100
    pub confidence: f64,
}

/// Triage classifier
#[async_trait]
pub trait TriageModel: Send + Sync {
    /// Predict risk tier and department
    async fn predict(&self, features: &PatientFeatures) -> Result<Prediction>;

    /// Features that drove the prediction, most significant first
    async fn explain(&self, features: &PatientFeatures) -> Result<Vec<String>>;
}

/// Vital sign columns available for population comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalField {
    HeartRate,
    Temperature,
    Systolic,
    Diastolic,
    OxygenSaturation,
}

impl VitalField {
    pub const ALL: [VitalField; 5] = [
        VitalField::HeartRate,
        VitalField::Temperature,
        VitalField::Systolic,
        VitalField::Diastolic,
        VitalField::OxygenSaturation,
    ];

    pub fn value(self, vitals: &VitalSigns) -> f64 {
        match self {
            VitalField::HeartRate => vitals.heart_rate as f64,
            VitalField::Temperature => vitals.temperature,
            VitalField::Systolic => vitals.systolic as f64,
            VitalField::Diastolic => vitals.diastolic as f64,
            VitalField::OxygenSaturation => vitals.oxygen_saturation as f64,
        }
    }
}

/// Population statistics
pub trait PopulationStats: Send + Sync {
    /// Share of the population (0-100) strictly below `value`, or `None`
    /// when there is no population to compare against.
    fn percentile(&self, field: VitalField, value: f64) -> Option<f64>;
}

/// Percentiles over a fixed population, computed once
#[derive(Debug, Clone, Default)]
pub struct DatasetPercentiles {
    columns: HashMap<VitalField, Vec<f64>>,
}

impl DatasetPercentiles {
    pub fn from_records(records: &[PatientRecord]) -> Self {
        let columns = VitalField::ALL
            .into_iter()
            .map(|field| {
                let mut column: Vec<f64> = records.iter().map(|r| field.value(&r.vitals)).collect();
                column.sort_by(f64::total_cmp);
                (field, column)
            })
            .collect();
        Self { columns }
    }

    pub fn population(&self) -> usize {
        self.columns.get(&VitalField::HeartRate).map_or(0, Vec::len)
    }
}

impl PopulationStats for DatasetPercentiles {
    fn percentile(&self, field: VitalField, value: f64) -> Option<f64> {
        let column = self.columns.get(&field).filter(|c| !c.is_empty())?;
        let below = column.partition_point(|&v| v < value);
        Some(below as f64 / column.len() as f64 * 100.0)
    }
}

/// Human readable population comparison for the prediction response
pub fn comparison_stats(stats: &dyn PopulationStats, vitals: &VitalSigns) -> BTreeMap<String, String> {
    [
        ("Heart_Rate_Percentile", VitalField::HeartRate),
        ("Temperature_Percentile", VitalField::Temperature),
        ("BP_Percentile", VitalField::Systolic),
    ]
    .into_iter()
    .filter_map(|(key, field)| {
        stats
            .percentile(field, field.value(vitals))
            .map(|p| (key.to_string(), format!("Higher than {:.1}% of patients", p)))
    })
    .collect()
}

struct SymptomRule {
    keywords: &'static [&'static str],
    department: &'static str,
    escalate: bool,
}

const SYMPTOM_RULES: &[SymptomRule] = &[
    SymptomRule { keywords: &["chest", "heart", "coronary", "angina"], department: "Cardiology", escalate: true },
    SymptomRule {
        keywords: &["stroke", "slurred", "facial", "droop", "paralysis"],
        department: "Neurology",
        escalate: true,
    },
    SymptomRule {
        keywords: &["breath", "lung", "respiratory", "asthma", "wheez"],
        department: "Pulmonology",
        escalate: true,
    },
    SymptomRule { keywords: &["bone", "fracture", "break", "dislocat"], department: "Orthopedics", escalate: false },
    SymptomRule { keywords: &["skin", "rash", "derma"], department: "Dermatology", escalate: false },
    SymptomRule {
        keywords: &["stomach", "abdomen", "gut", "vomit"],
        department: "Gastroenterology",
        escalate: false,
    },
];

/// Apply the keyword safety net. The first matching group wins; critical
/// groups also force `High` risk.
pub fn apply_symptom_override(mut prediction: Prediction, symptoms: &str) -> Prediction {
    let symptoms = symptoms.to_lowercase();

    if let Some(rule) = SYMPTOM_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| symptoms.contains(k)))
    {
        prediction.department = rule.department.to_string();
        if rule.escalate {
            prediction.risk = RiskLevel::High;
        }
    }

    prediction
}

/// Threshold-based classifier used when no trained model is attached
#[derive(Debug, Clone, Default)]
pub struct VitalsRuleModel;

impl VitalsRuleModel {
    fn findings(features: &PatientFeatures) -> Vec<&'static str> {
        let v = &features.vitals;
        let mut findings = Vec::new();

        if v.systolic > 140 || v.diastolic > 90 {
            findings.push("High Blood Pressure");
        }
        if v.heart_rate > 100 {
            findings.push("Tachycardia (High HR)");
        }
        if v.heart_rate < 60 {
            findings.push("Bradycardia (Low HR)");
        }
        if v.temperature > 38.0 {
            findings.push("Fever");
        }
        if v.oxygen_saturation < 95 {
            findings.push("Low Oxygen Saturation");
        }
        if features.age > 65 {
            findings.push("Advanced Age Risk Factor");
        }

        findings
    }
}

#[async_trait]
impl TriageModel for VitalsRuleModel {
    async fn predict(&self, features: &PatientFeatures) -> Result<Prediction> {
        let v = &features.vitals;
        let critical = v.oxygen_saturation < 90
            || v.systolic > 180
            || v.heart_rate > 130
            || v.temperature > 40.0;
        let findings = Self::findings(features).len();

        let risk = if critical || findings >= 3 {
            RiskLevel::High
        } else if findings > 0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(Prediction {
            risk,
            department: "General Medicine".to_string(),
            confidence: (60.0 + 10.0 * findings as f64).min(95.0),
        })
    }

    async fn explain(&self, features: &PatientFeatures) -> Result<Vec<String>> {
        let mut findings: Vec<String> = Self::findings(features).into_iter().map(String::from).collect();
        if findings.is_empty() {
            findings.push("Normal Vitals".to_string());
        }
        findings.truncate(3);
        Ok(findings)
    }
}
