//! Patient dataset loading
//!
//! The dataset is a JSON array using the hospital export's column names.
//! Loading favors availability over strict validation: a missing or
//! malformed or implausible vital is replaced with its documented default and the record is
//! kept.

use std::ops::RangeInclusive;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::record::{new_patient_id, PatientRecord};
use super::vitals::{Gender, RiskLevel, VitalSigns};
use crate::error::Result;

/// One dataset row as found on disk; every column is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatientRow {
    #[serde(rename = "Patient_ID")]
    pub id: Value,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Age")]
    pub age: Value,
    #[serde(rename = "Gender")]
    pub gender: Option<String>,
    #[serde(rename = "Symptoms")]
    pub symptoms: Option<String>,
    #[serde(rename = "BP_Systolic")]
    pub systolic: Value,
    #[serde(rename = "BP_Diastolic")]
    pub diastolic: Value,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: Value,
    #[serde(rename = "Temperature")]
    pub temperature: Value,
    #[serde(rename = "O2_Saturation")]
    pub oxygen_saturation: Value,
    #[serde(rename = "Chronic_Conditions")]
    pub chronic_conditions: Option<String>,
    #[serde(rename = "Medical_Notes")]
    pub medical_notes: Option<String>,
    #[serde(rename = "Risk_Level")]
    pub risk_level: Option<String>,
    #[serde(rename = "Department")]
    pub department: Option<String>,
}

/// Read a dataset file into registry records
pub fn load_dataset(path: &Path) -> Result<Vec<PatientRecord>> {
    let raw = std::fs::read_to_string(path)?;
    let records = parse_dataset(&raw)?;
    info!("Loaded {} patients from {}", records.len(), path.display());
    Ok(records)
}

/// Parse dataset JSON. Rows that are not objects are skipped.
pub fn parse_dataset(raw: &str) -> Result<Vec<PatientRecord>> {
    let rows: Vec<Value> = serde_json::from_str(raw)?;
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<PatientRow>(row) {
            Ok(row) => records.push(row.into_record()),
            Err(e) => warn!("Skipping dataset row {}: {}", index, e),
        }
    }

    Ok(records)
}

impl PatientRow {
    /// Convert into a registry record, substituting defaults
    pub fn into_record(self) -> PatientRecord {
        let mut defaulted: Vec<&'static str> = Vec::new();

        let mut int_or =
            |value: &Value, field: &'static str, range: RangeInclusive<i32>, default: i32| {
                as_i64(value)
                    .and_then(|v| i32::try_from(v).ok())
                    .filter(|v| range.contains(v))
                    .unwrap_or_else(|| {
                        defaulted.push(field);
                        default
                    })
            };

        let heart_rate = int_or(
            &self.heart_rate,
            "Heart_Rate",
            VitalSigns::PLAUSIBLE_HEART_RATE,
            VitalSigns::DEFAULT_HEART_RATE,
        );
        let systolic = int_or(
            &self.systolic,
            "BP_Systolic",
            VitalSigns::PLAUSIBLE_SYSTOLIC,
            VitalSigns::DEFAULT_SYSTOLIC,
        );
        let diastolic = int_or(
            &self.diastolic,
            "BP_Diastolic",
            VitalSigns::PLAUSIBLE_DIASTOLIC,
            VitalSigns::DEFAULT_DIASTOLIC,
        );
        let oxygen_saturation = int_or(
            &self.oxygen_saturation,
            "O2_Saturation",
            VitalSigns::PLAUSIBLE_OXYGEN_SATURATION,
            VitalSigns::DEFAULT_OXYGEN_SATURATION,
        );
        let temperature = as_f64(&self.temperature)
            .filter(|t| VitalSigns::PLAUSIBLE_TEMPERATURE.contains(t))
            .unwrap_or_else(|| {
                defaulted.push("Temperature");
                VitalSigns::DEFAULT_TEMPERATURE
            });

        let id = match &self.id {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => new_patient_id(),
        };

        if !defaulted.is_empty() {
            warn!("Patient {}: defaulted vitals {:?}", id, defaulted);
        }

        let vitals = VitalSigns {
            heart_rate,
            temperature,
            systolic,
            diastolic,
            oxygen_saturation,
        };

        let risk = self
            .risk_level
            .as_deref()
            .and_then(|r| r.parse::<RiskLevel>().ok())
            .unwrap_or_default();

        let mut record = PatientRecord::new(id, self.name.unwrap_or_else(|| "Unknown".to_string()), vitals)
            .with_baseline_risk(risk);
        record.age = as_i64(&self.age).map(|a| a.max(0) as u32).unwrap_or(0);
        record.gender = self
            .gender
            .as_deref()
            .and_then(|g| g.parse::<Gender>().ok())
            .unwrap_or_default();
        record.symptoms = self.symptoms.unwrap_or_default();
        record.chronic_conditions = self.chronic_conditions.unwrap_or_else(|| "None".to_string());
        record.medical_notes = self.medical_notes.unwrap_or_default();
        record.department = self.department.unwrap_or_default();
        record
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn as_i64(value: &Value) -> Option<i64> {
    as_f64(value).map(|v| v.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_full_row() {
        let raw = r#"[{
            "Patient_ID": "abc", "Name": "Ada Doe", "Age": 54, "Gender": "Female",
            "Symptoms": "Chest Pain", "BP_Systolic": 165, "BP_Diastolic": 95,
            "Heart_Rate": 118, "Temperature": 37.4, "O2_Saturation": 93,
            "Chronic_Conditions": "Hypertension", "Risk_Level": "High", "Department": "Cardiology"
        }]"#;
        let records = parse_dataset(raw).unwrap();
        assert_eq!(records.len(), 1);
        let p = &records[0];
        assert_eq!(p.id, "abc");
        assert_eq!(p.gender, Gender::Female);
        assert_eq!(p.vitals.heart_rate, 118);
        assert_eq!(p.vitals.temperature, 37.4);
        assert_eq!(p.risk_level, RiskLevel::High);
        assert_eq!(p.baseline_risk, RiskLevel::High);
        assert_eq!(p.department, "Cardiology");
        assert!(p.scenario.is_none());
    }

    #[test]
    fn test_missing_and_malformed_vitals_use_defaults() {
        let raw = r#"[{"Name": "No Vitals", "Heart_Rate": "fast", "Temperature": null, "BP_Systolic": "131"}]"#;
        let records = parse_dataset(raw).unwrap();
        let p = &records[0];
        assert_eq!(p.vitals.heart_rate, 80);
        assert_eq!(p.vitals.temperature, 37.0);
        assert_eq!(p.vitals.systolic, 131);
        assert_eq!(p.vitals.diastolic, 80);
        assert_eq!(p.vitals.oxygen_saturation, 98);
        assert_eq!(p.risk_level, RiskLevel::Low);
        assert!(!p.id.is_empty());
    }

    #[test]
    fn test_implausible_vitals_use_defaults() {
        let raw = r#"[
            {"Patient_ID": "max", "Heart_Rate": 2147483647, "O2_Saturation": 140},
            {"Patient_ID": "wrap", "Heart_Rate": 4294967376, "BP_Systolic": -20, "Temperature": 98.6},
            {"Patient_ID": "ok", "Heart_Rate": 75, "BP_Diastolic": 0, "O2_Saturation": 100}
        ]"#;
        let records = parse_dataset(raw).unwrap();

        assert_eq!(records[0].vitals.heart_rate, VitalSigns::DEFAULT_HEART_RATE);
        assert_eq!(records[0].vitals.oxygen_saturation, VitalSigns::DEFAULT_OXYGEN_SATURATION);
        assert_eq!(records[1].vitals.heart_rate, VitalSigns::DEFAULT_HEART_RATE);
        assert_eq!(records[1].vitals.systolic, VitalSigns::DEFAULT_SYSTOLIC);
        assert_eq!(records[1].vitals.temperature, VitalSigns::DEFAULT_TEMPERATURE);
        assert_eq!(records[2].vitals.heart_rate, 75);
        assert_eq!(records[2].vitals.diastolic, 0);
        assert_eq!(records[2].vitals.oxygen_saturation, 100);
    }

    #[test]
    fn test_non_object_rows_are_skipped() {
        let records = parse_dataset(r#"[1, {"Name": "Kept"}, "x"]"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Kept");
    }

    #[test]
    fn test_load_dataset_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"Patient_ID": 42, "Name": "From File", "Heart_Rate": 72}}]"#).unwrap();
        let records = load_dataset(file.path()).unwrap();
        assert_eq!(records[0].id, "42");
        assert_eq!(records[0].vitals.heart_rate, 72);
    }

    #[test]
    fn test_not_an_array_is_an_error() {
        assert!(parse_dataset(r#"{"Name": "x"}"#).is_err());
    }
}
