use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::doctor::{DepartmentStats, DoctorRecord, DoctorStatus};
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct AvailabilityUpdate {
    pub doctor_name: String,
    pub status: String,
}

pub async fn doctor_list(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<DoctorRecord>>> {
    Json(state.scheduler.doctors().grouped())
}

pub async fn department_stats(State(state): State<AppState>) -> Json<BTreeMap<String, DepartmentStats>> {
    Json(state.scheduler.doctors().department_stats())
}

pub async fn toggle_availability(
    State(state): State<AppState>,
    Json(update): Json<AvailabilityUpdate>,
) -> Result<Json<Value>> {
    let status: DoctorStatus = update.status.parse()?;
    let new_state = state.scheduler.doctors().set_status(&update.doctor_name, status)?;
    Ok(Json(json!({ "status": "success", "new_state": new_state })))
}

pub async fn reset_doctors(State(state): State<AppState>) -> Json<Value> {
    state.scheduler.doctors().reset();
    Json(json!({ "status": "All doctors reset to Available" }))
}
