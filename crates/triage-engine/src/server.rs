//! # Triage Server
//!
//! Owns the patient and doctor registries, the broadcast hub, the simulation
//! driver task and the HTTP listener, and manages their lifecycle.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                TriageServer                  │
//! ├──────────────────────────────────────────────┤
//! │  axum router (api)   │  SimulationDriver task│
//! ├──────────────────────┴───────────────────────┤
//! │ PatientRegistry │ BroadcastHub │ DoctorRegistry│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use triage_engine::{config::TriageConfig, server::TriageServerBuilder};
//!
//! # async fn example() -> triage_engine::Result<()> {
//! let mut server = TriageServerBuilder::new()
//!     .with_config(TriageConfig::default())
//!     .build()?;
//!
//! let addr = server.start().await?;
//! println!("listening on {}", addr);
//!
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{self, AppState};
use crate::broadcast::BroadcastHub;
use crate::collaborators::{PopulationStats, TriageModel};
use crate::config::TriageConfig;
use crate::doctor::{default_roster, AssignmentScheduler, DoctorRecord, DoctorRegistry};
use crate::error::{Result, TriageError};
use crate::patient::dataset::load_dataset;
use crate::patient::seed::synthetic_population;
use crate::patient::{PatientRecord, PatientRegistry};
use crate::simulation::{SimulationDriver, SimulationStatus};

/// Time allowed for the HTTP listener to drain on stop
const HTTP_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A complete triage server
pub struct TriageServer {
    config: TriageConfig,
    patients: Arc<PatientRegistry>,
    hub: Arc<BroadcastHub>,
    scheduler: Arc<AssignmentScheduler>,
    state: AppState,

    /// Taken by `start`
    driver: Option<SimulationDriver>,
    status: Arc<SimulationStatus>,

    shutdown_tx: watch::Sender<bool>,
    driver_handle: Option<JoinHandle<()>>,
    http_handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl TriageServer {
    /// Create a server over an explicit initial population and roster
    pub fn new(config: TriageConfig, patients: Vec<PatientRecord>, doctors: Vec<DoctorRecord>) -> Result<Self> {
        config.validate()?;

        let sim = &config.simulation;
        let patients = Arc::new(PatientRegistry::new(patients, sim.history_capacity));
        let hub = Arc::new(BroadcastHub::new(sim.subscriber_buffer));
        let scheduler = Arc::new(AssignmentScheduler::new(
            Arc::new(DoctorRegistry::new(doctors)),
            config.assignment.seed,
        ));

        let driver = SimulationDriver::new(patients.clone(), hub.clone(), sim.tick_interval(), sim.seed);
        let status = driver.status();

        let mut state = AppState::new(patients.clone(), hub.clone(), scheduler.clone(), status.clone())
            .with_snapshot_limit(config.server.snapshot_limit);
        if let Some(seed) = sim.seed {
            state = state.with_arrival_seed(seed.wrapping_add(1));
        }

        info!(
            "🏥 Triage server created: {} patients, {} doctors",
            patients.len(),
            scheduler.doctors().len()
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            patients,
            hub,
            scheduler,
            state,
            driver: Some(driver),
            status,
            shutdown_tx,
            driver_handle: None,
            http_handle: None,
            local_addr: None,
        })
    }

    /// Create a server from configuration alone: the dataset file when one is
    /// configured, a synthetic population otherwise, and the default roster.
    pub fn from_config(config: TriageConfig) -> Result<Self> {
        let patients = initial_population(&config)?;
        Self::new(config, patients, default_roster())
    }

    /// Bind the listener, spawn the simulation driver and start serving.
    /// Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let driver = self
            .driver
            .take()
            .ok_or_else(|| TriageError::internal("server already started"))?;

        let listener = TcpListener::bind(self.config.server.socket_addr()?).await?;
        let addr = listener.local_addr()?;
        self.local_addr = Some(addr);

        self.driver_handle = Some(tokio::spawn(driver.run(self.shutdown_tx.subscribe())));
        info!("✅ Simulation driver started");

        let app = self.router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.http_handle = Some(tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            });

            if let Err(e) = server.await {
                error!("HTTP server error: {}", e);
            }
        }));

        info!("✅ Triage API listening on http://{}", addr);
        Ok(addr)
    }

    /// Stop the driver and the listener and close every live stream
    pub async fn stop(&mut self) -> Result<()> {
        info!("🛑 Stopping triage server...");
        self.shutdown_tx.send_replace(true);

        let closed = self.hub.close_all();
        if closed > 0 {
            info!("Closed {} live streams", closed);
        }

        if let Some(handle) = self.driver_handle.take() {
            if let Err(e) = handle.await {
                error!("Simulation driver ended abnormally: {}", e);
            }
        }

        if let Some(mut handle) = self.http_handle.take() {
            if tokio::time::timeout(HTTP_SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!("HTTP listener did not drain in {:?}, aborting", HTTP_SHUTDOWN_GRACE);
                handle.abort();
            }
        }

        info!("✅ Triage server stopped");
        Ok(())
    }

    /// Attach a triage classifier for the prediction endpoint
    pub fn with_model(mut self, model: Arc<dyn TriageModel>) -> Self {
        self.state = self.state.with_model(model);
        self
    }

    /// Replace the population statistics collaborator
    pub fn with_population(mut self, population: Arc<dyn PopulationStats>) -> Self {
        self.state = self.state.with_population(population);
        self
    }

    /// Router over this server's state, for embedding or in-process tests
    pub fn router(&self) -> Router {
        api::router(self.state.clone(), self.config.server.enable_cors)
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn patients(&self) -> &Arc<PatientRegistry> {
        &self.patients
    }

    pub fn doctors(&self) -> &Arc<DoctorRegistry> {
        self.scheduler.doctors()
    }

    pub fn scheduler(&self) -> &Arc<AssignmentScheduler> {
        &self.scheduler
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn simulation_status(&self) -> &Arc<SimulationStatus> {
        &self.status
    }

    /// Address bound by `start`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.driver_handle.is_some()
    }
}

/// Population the registry starts with
fn initial_population(config: &TriageConfig) -> Result<Vec<PatientRecord>> {
    let sim = &config.simulation;
    match &sim.dataset_path {
        Some(path) => load_dataset(path),
        None => {
            let mut rng = match sim.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            info!("No dataset configured, generating {} synthetic patients", sim.synthetic_population);
            Ok(synthetic_population(sim.synthetic_population, &mut rng))
        }
    }
}

/// Builder for [`TriageServer`]
#[derive(Default)]
pub struct TriageServerBuilder {
    config: Option<TriageConfig>,
    patients: Option<Vec<PatientRecord>>,
    doctors: Option<Vec<DoctorRecord>>,
    model: Option<Arc<dyn TriageModel>>,
    population: Option<Arc<dyn PopulationStats>>,
}

impl TriageServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: TriageConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Start from these patients instead of the configured dataset
    pub fn with_patients(mut self, patients: Vec<PatientRecord>) -> Self {
        self.patients = Some(patients);
        self
    }

    /// Replace the default roster
    pub fn with_doctors(mut self, doctors: Vec<DoctorRecord>) -> Self {
        self.doctors = Some(doctors);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn TriageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_population(mut self, population: Arc<dyn PopulationStats>) -> Self {
        self.population = Some(population);
        self
    }

    pub fn build(self) -> Result<TriageServer> {
        let config = self.config.unwrap_or_default();
        let patients = match self.patients {
            Some(patients) => patients,
            None => initial_population(&config)?,
        };
        let doctors = self.doctors.unwrap_or_else(default_roster);

        let mut server = TriageServer::new(config, patients, doctors)?;
        if let Some(model) = self.model {
            server = server.with_model(model);
        }
        if let Some(population) = self.population {
            server = server.with_population(population);
        }
        Ok(server)
    }
}
