//! Prediction glue: classifier, keyword safety net, assignment, explanation
//! and population comparison folded into one response.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{error, info};

use super::AppState;
use crate::collaborators::{apply_symptom_override, comparison_stats, PatientFeatures};
use crate::error::{Result, TriageError};
use crate::patient::RiskLevel;

const MAX_EXPLANATION: usize = 3;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(rename = "Predicted_Risk")]
    pub predicted_risk: RiskLevel,
    #[serde(rename = "Risk_Confidence")]
    pub risk_confidence: f64,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Assigned_Doctor")]
    pub assigned_doctor: String,
    #[serde(rename = "Assigned_Doctor_ID")]
    pub assigned_doctor_id: String,
    #[serde(rename = "Doctor_Status")]
    pub doctor_status: &'static str,
    pub explanation: Vec<String>,
    pub comparison_stats: BTreeMap<String, String>,
    #[serde(rename = "Medical_Notes")]
    pub medical_notes: String,
    #[serde(rename = "Pre_Existing_Conditions")]
    pub pre_existing_conditions: String,
    #[serde(rename = "Symptoms")]
    pub symptoms: String,
}

pub async fn predict(
    State(state): State<AppState>,
    Json(features): Json<PatientFeatures>,
) -> Result<Json<PredictionResponse>> {
    let model = state.model.as_ref().ok_or(TriageError::ModelUnavailable)?;

    let prediction = model
        .predict(&features)
        .await
        .map_err(|e| model_failure("prediction", e))?;
    let prediction = apply_symptom_override(prediction, &features.symptoms);

    // explain before assigning so a failed request never marks a doctor busy
    let mut explanation = model
        .explain(&features)
        .await
        .map_err(|e| model_failure("explanation", e))?;
    explanation.truncate(MAX_EXPLANATION);
    if explanation.is_empty() {
        explanation.push("Complex Pattern Detected".to_string());
    }

    let assignment = state.scheduler.assign(&prediction.department, prediction.risk);

    info!(
        "🚑 Triage: {} risk -> {} ({})",
        prediction.risk,
        prediction.department,
        assignment.name()
    );

    Ok(Json(PredictionResponse {
        predicted_risk: prediction.risk,
        risk_confidence: prediction.confidence,
        department: prediction.department,
        assigned_doctor: assignment.name().to_string(),
        assigned_doctor_id: assignment.id().to_string(),
        doctor_status: "Notified",
        explanation,
        comparison_stats: comparison_stats(state.population.as_ref(), &features.vitals),
        medical_notes: features.medical_notes,
        pre_existing_conditions: features.pre_existing_conditions,
        symptoms: features.symptoms,
    }))
}

fn model_failure(stage: &str, err: TriageError) -> TriageError {
    error!("Triage model {} failed: {}", stage, err);
    match err {
        TriageError::Collaborator(_) => err,
        other => TriageError::collaborator(format!("triage model {} failed: {}", stage, other)),
    }
}
