//! # HTTP API
//!
//! axum router exposing the live vitals stream, patient accessors, doctor
//! roster management and the prediction endpoint.
//!
//! | route | handler |
//! |---|---|
//! | `GET /health` | [`health`] |
//! | `GET /ws/vitals` | [`stream::vitals_stream`] |
//! | `GET /patients` | [`patients::list_patients`] |
//! | `POST /simulate_arrival` | [`patients::simulate_arrival`] |
//! | `GET /get_doctor_list` | [`doctors::doctor_list`] |
//! | `GET /get_department_stats` | [`doctors::department_stats`] |
//! | `POST /toggle_availability` | [`doctors::toggle_availability`] |
//! | `POST /reset_doctors` | [`doctors::reset_doctors`] |
//! | `POST /predict` | [`predict::predict`] |

pub mod doctors;
pub mod patients;
pub mod predict;
pub mod stream;

use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::broadcast::BroadcastHub;
use crate::collaborators::{DatasetPercentiles, PopulationStats, TriageModel};
use crate::doctor::AssignmentScheduler;
use crate::patient::PatientRegistry;
use crate::simulation::SimulationStatus;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub patients: Arc<PatientRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub scheduler: Arc<AssignmentScheduler>,
    pub simulation: Arc<SimulationStatus>,
    pub model: Option<Arc<dyn TriageModel>>,
    pub population: Arc<dyn PopulationStats>,
    pub snapshot_limit: usize,
    arrival_rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// State without a classifier; population statistics are taken from the
    /// registry's current population.
    pub fn new(
        patients: Arc<PatientRegistry>,
        hub: Arc<BroadcastHub>,
        scheduler: Arc<AssignmentScheduler>,
        simulation: Arc<SimulationStatus>,
    ) -> Self {
        let population = Arc::new(DatasetPercentiles::from_records(&patients.snapshot().patients));

        Self {
            patients,
            hub,
            scheduler,
            simulation,
            model: None,
            population,
            snapshot_limit: 50,
            arrival_rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn TriageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_population(mut self, population: Arc<dyn PopulationStats>) -> Self {
        self.population = population;
        self
    }

    pub fn with_snapshot_limit(mut self, limit: usize) -> Self {
        self.snapshot_limit = limit;
        self
    }

    /// Seed the generator behind synthetic arrivals
    pub fn with_arrival_seed(mut self, seed: u64) -> Self {
        self.arrival_rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }
}

/// Build the application router
pub fn router(state: AppState, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/ws/vitals", get(stream::vitals_stream))
        .route("/patients", get(patients::list_patients))
        .route("/simulate_arrival", post(patients::simulate_arrival))
        .route("/get_doctor_list", get(doctors::doctor_list))
        .route("/get_department_stats", get(doctors::department_stats))
        .route("/toggle_availability", post(doctors::toggle_availability))
        .route("/reset_doctors", post(doctors::reset_doctors))
        .route("/predict", post(predict::predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
            .allow_origin(Any);
        app.layer(cors)
    } else {
        app
    }
}

/// Liveness plus simulation counters
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "active",
        "models_loaded": state.model.is_some(),
        "patients": state.patients.len(),
        "subscribers": state.hub.subscriber_count(),
        "simulation": state.simulation.stats(),
    }))
}
