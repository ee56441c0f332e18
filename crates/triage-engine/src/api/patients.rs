use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::error::Result;
use crate::patient::PatientRecord;

/// First `snapshot_limit` patients
pub async fn list_patients(State(state): State<AppState>) -> Json<Vec<PatientRecord>> {
    Json(state.patients.first(state.snapshot_limit))
}

/// A simulated new arrival; `{}` when there is nobody to clone
pub async fn simulate_arrival(State(state): State<AppState>) -> Result<Json<Value>> {
    let arrival = {
        let mut rng = state.arrival_rng.lock();
        state.patients.synthetic_arrival(&mut *rng)
    };

    match arrival {
        Some(patient) => Ok(Json(serde_json::to_value(patient)?)),
        None => Ok(Json(json!({}))),
    }
}
