//! # Simulation Driver
//!
//! Background task that advances the patient registry on a fixed cadence
//! and hands each resulting snapshot to the broadcast hub.
//!
//! ```text
//! loop {
//!     registry.tick(rng)  ──► Snapshot ──► hub.broadcast()
//!     sleep(tick_interval)  (or stop on shutdown signal)
//! }
//! ```
//!
//! Ticks never overlap: the next one starts only after the previous tick and
//! its broadcast have completed and the interval has elapsed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::broadcast::{BroadcastHub, Delivery};
use crate::patient::{PatientRegistry, TickReport};

/// Live counters published by the driver
#[derive(Debug, Default)]
pub struct SimulationStatus {
    ticks: AtomicU64,
    failed_ticks: AtomicU64,
    last_flagged: AtomicUsize,
    last_tick_at: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`SimulationStatus`]
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStats {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub flagged_patients: usize,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl SimulationStatus {
    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            failed_ticks: self.failed_ticks.load(Ordering::Relaxed),
            flagged_patients: self.last_flagged.load(Ordering::Relaxed),
            last_tick_at: *self.last_tick_at.read(),
        }
    }

    fn record(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.last_flagged.store(report.flagged, Ordering::Relaxed);
        *self.last_tick_at.write() = Some(Utc::now());
    }
}

/// Drives the registry and feeds the hub
pub struct SimulationDriver<R = StdRng> {
    registry: Arc<PatientRegistry>,
    hub: Arc<BroadcastHub>,
    status: Arc<SimulationStatus>,
    interval: Duration,
    rng: R,
}

impl SimulationDriver {
    /// Create a driver. A `seed` makes the drift sequence reproducible.
    pub fn new(
        registry: Arc<PatientRegistry>,
        hub: Arc<BroadcastHub>,
        interval: Duration,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(registry, hub, interval, rng)
    }
}

impl<R: Rng> SimulationDriver<R> {
    /// Create a driver drawing drift from `rng`
    pub fn with_rng(
        registry: Arc<PatientRegistry>,
        hub: Arc<BroadcastHub>,
        interval: Duration,
        rng: R,
    ) -> Self {
        Self {
            registry,
            hub,
            status: Arc::new(SimulationStatus::default()),
            interval,
            rng,
        }
    }

    /// Shared handle to the driver's counters
    pub fn status(&self) -> Arc<SimulationStatus> {
        self.status.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick and broadcast its snapshot. A panic inside the tick is
    /// contained and reported as `None`: the registry keeps its previous
    /// state, nothing is broadcast and the next tick proceeds normally.
    pub fn tick_once(&mut self) -> Option<(TickReport, Delivery)> {
        let registry = &self.registry;
        let rng = &mut self.rng;

        match catch_unwind(AssertUnwindSafe(|| registry.tick(rng))) {
            Ok(report) => {
                let delivery = self.hub.broadcast(&report.snapshot);
                self.status.record(&report);
                debug!(
                    "tick {} broadcast to {} subscribers ({} dropped)",
                    report.tick, delivery.delivered, delivery.dropped
                );
                Some((report, delivery))
            }
            Err(_) => {
                self.status.failed_ticks.fetch_add(1, Ordering::Relaxed);
                error!("🚨 Simulation tick panicked - continuing with next tick");
                None
            }
        }
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "🩺 Simulation driver started: {} patients, tick every {:?}",
            self.registry.len(),
            self.interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.tick_once();

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("🛑 Simulation driver stopped after {} ticks", self.status.stats().ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::seed::synthetic_population;
    use crate::patient::DEFAULT_HISTORY_CAPACITY;
    use rand::RngCore;

    fn driver(seed: u64, interval: Duration) -> (SimulationDriver, Arc<BroadcastHub>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let registry = Arc::new(PatientRegistry::new(
            synthetic_population(12, &mut rng),
            DEFAULT_HISTORY_CAPACITY,
        ));
        let hub = Arc::new(BroadcastHub::new(8));
        let driver = SimulationDriver::new(registry, hub.clone(), interval, Some(seed));
        (driver, hub)
    }

    #[tokio::test]
    async fn test_tick_once_broadcasts_snapshot() {
        let (mut driver, hub) = driver(1, Duration::from_secs(2));
        let registry = driver.registry.clone();
        let mut sub = hub.connect(|| registry.snapshot());

        let (report, delivery) = driver.tick_once().unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(delivery.delivered, 1);

        assert_eq!(sub.receiver.recv().await.unwrap().tick, 0);
        let pushed = sub.receiver.recv().await.unwrap();
        assert_eq!(pushed.tick, 1);
        assert_eq!(pushed.len(), 12);

        let stats = driver.status().stats();
        assert_eq!(stats.ticks, 1);
        assert!(stats.last_tick_at.is_some());
    }

    #[test]
    fn test_seeded_drivers_are_reproducible() {
        let (mut a, _) = driver(9, Duration::from_secs(2));
        let (mut b, _) = driver(9, Duration::from_secs(2));
        for _ in 0..5 {
            let (ra, _) = a.tick_once().unwrap();
            let (rb, _) = b.tick_once().unwrap();
            assert_eq!(*ra.snapshot.patients, *rb.snapshot.patients);
        }
    }

    /// Drift source that panics on one chosen draw, then behaves
    struct FaultyRng {
        inner: StdRng,
        panic_at: Option<usize>,
        draws: usize,
    }

    impl FaultyRng {
        fn new(seed: u64, panic_at: usize) -> Self {
            Self {
                inner: StdRng::seed_from_u64(seed),
                panic_at: Some(panic_at),
                draws: 0,
            }
        }

        fn draw(&mut self) {
            self.draws += 1;
            if self.panic_at == Some(self.draws) {
                self.panic_at = None;
                panic!("drift source failed");
            }
        }
    }

    impl RngCore for FaultyRng {
        fn next_u32(&mut self) -> u32 {
            self.draw();
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.draw();
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.draw();
            self.inner.fill_bytes(dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            self.draw();
            self.inner.try_fill_bytes(dest)
        }
    }

    #[tokio::test]
    async fn test_panicking_tick_is_contained() {
        let registry = Arc::new(PatientRegistry::new(
            synthetic_population(12, &mut StdRng::seed_from_u64(2)),
            DEFAULT_HISTORY_CAPACITY,
        ));
        let hub = Arc::new(BroadcastHub::new(8));
        // fails several patients into the first pass
        let mut driver = SimulationDriver::with_rng(
            registry.clone(),
            hub.clone(),
            Duration::from_secs(2),
            FaultyRng::new(2, 10),
        );
        let mut sub = hub.connect(|| registry.snapshot());
        let before = registry.snapshot();

        assert!(driver.tick_once().is_none());
        let stats = driver.status().stats();
        assert_eq!((stats.ticks, stats.failed_ticks), (0, 1));

        // no patient was half advanced and nothing was pushed
        let after = registry.snapshot();
        assert_eq!(after.tick, 0);
        assert_eq!(*after.patients, *before.patients);
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 0);
        assert!(sub.receiver.try_recv().is_err());

        let (report, delivery) = driver.tick_once().unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(delivery.delivered, 1);
        assert!(report.snapshot.patients.iter().all(|p| p.history.len() == 1));
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 1);
        assert_eq!(driver.status().stats().failed_ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval_and_stops() {
        let (driver, hub) = driver(3, Duration::from_millis(100));
        let status = driver.status();
        let (tx, rx) = watch::channel(false);
        let mut sub = hub.connect(|| driver.registry.snapshot());

        let task = tokio::spawn(driver.run(rx));

        // initial snapshot, then the first tick fires immediately
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 0);
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 1);
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 2);
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 3);

        tx.send(true).unwrap();
        task.await.unwrap();
        assert!(status.stats().ticks >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_sender_dropped() {
        let (driver, _hub) = driver(4, Duration::from_secs(60));
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(driver.run(rx));
        tokio::task::yield_now().await;
        drop(tx);
        task.await.unwrap();
    }
}
