//! Live vitals stream over a real listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use triage_engine::api::{self, AppState};
use triage_engine::broadcast::BroadcastHub;
use triage_engine::doctor::{AssignmentScheduler, DoctorRegistry};
use triage_engine::patient::seed::synthetic_population;
use triage_engine::patient::{PatientRegistry, DEFAULT_HISTORY_CAPACITY};
use triage_engine::simulation::SimulationDriver;
use triage_engine::{TriageConfig, TriageServerBuilder};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    addr: SocketAddr,
    patients: Arc<PatientRegistry>,
    hub: Arc<BroadcastHub>,
    driver: SimulationDriver,
}

/// Serve the router without a background driver so ticks are driven by hand
async fn harness(population: usize) -> Harness {
    let patients = Arc::new(PatientRegistry::new(
        synthetic_population(population, &mut StdRng::seed_from_u64(5)),
        DEFAULT_HISTORY_CAPACITY,
    ));
    let hub = Arc::new(BroadcastHub::new(8));
    let scheduler = Arc::new(AssignmentScheduler::new(Arc::new(DoctorRegistry::default()), Some(5)));
    let driver = SimulationDriver::new(patients.clone(), hub.clone(), Duration::from_secs(2), Some(5));

    let state = AppState::new(patients.clone(), hub.clone(), scheduler, driver.status());
    let app = api::router(state, false);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Harness {
        addr,
        patients,
        hub,
        driver,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws/vitals", addr)).await.unwrap();
    client
}

async fn next_snapshot(client: &mut Client) -> Vec<Value> {
    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("no snapshot within 5s")
        .expect("stream ended")
        .unwrap();
    match frame {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {:?}", other),
    }
}

async fn wait_for_subscribers(hub: &BroadcastHub, expected: usize) {
    for _ in 0..100 {
        if hub.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {} subscribers, have {}", expected, hub.subscriber_count());
}

#[tokio::test]
async fn test_initial_snapshot_matches_registry() {
    let mut h = harness(12).await;
    h.driver.tick_once();
    h.driver.tick_once();

    let mut client = connect(h.addr).await;
    let first = next_snapshot(&mut client).await;

    let expected: Value = serde_json::from_str(&h.patients.snapshot().to_json().unwrap()).unwrap();
    assert_eq!(Value::Array(first), expected);
}

#[tokio::test]
async fn test_each_tick_is_pushed() {
    let mut h = harness(8).await;
    let mut client = connect(h.addr).await;

    let initial = next_snapshot(&mut client).await;
    assert_eq!(initial.len(), 8);
    assert!(initial.iter().all(|p| p["history"].as_array().unwrap().is_empty()));
    wait_for_subscribers(&h.hub, 1).await;

    for tick in 1..=3usize {
        let (_, delivery) = h.driver.tick_once().unwrap();
        assert_eq!(delivery.delivered, 1);

        let pushed = next_snapshot(&mut client).await;
        assert_eq!(pushed.len(), 8);
        for patient in &pushed {
            assert_eq!(patient["history"].as_array().unwrap().len(), tick);
            assert!(patient["scenario"].is_string());
        }
    }
}

#[tokio::test]
async fn test_inbound_frames_are_ignored() {
    let mut h = harness(3).await;
    let mut client = connect(h.addr).await;
    next_snapshot(&mut client).await;
    wait_for_subscribers(&h.hub, 1).await;

    client.send(Message::Text("ping".to_string())).await.unwrap();
    h.driver.tick_once();
    assert_eq!(next_snapshot(&mut client).await.len(), 3);
}

#[tokio::test]
async fn test_closed_client_leaves_others_untouched() {
    let mut h = harness(4).await;
    let mut staying = connect(h.addr).await;
    let mut leaving = connect(h.addr).await;
    next_snapshot(&mut staying).await;
    next_snapshot(&mut leaving).await;
    wait_for_subscribers(&h.hub, 2).await;

    leaving.close(None).await.unwrap();
    drop(leaving);
    wait_for_subscribers(&h.hub, 1).await;

    let (_, delivery) = h.driver.tick_once().unwrap();
    assert_eq!(delivery.delivered, 1);
    assert_eq!(next_snapshot(&mut staying).await.len(), 4);
}

#[tokio::test]
async fn test_server_streams_and_stops() {
    let mut config = TriageConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.simulation.tick_interval_ms = 50;
    config.simulation.synthetic_population = 6;
    config.simulation.seed = Some(17);

    let mut server = TriageServerBuilder::new().with_config(config).build().unwrap();
    let addr = server.start().await.unwrap();

    let mut client = connect(addr).await;
    let mut snapshots = Vec::new();
    for _ in 0..3 {
        snapshots.push(next_snapshot(&mut client).await);
    }
    assert!(snapshots.iter().all(|s| s.len() == 6));

    // two pushes after the initial snapshot, so at least two ticks of history
    let history_len = |s: &Vec<Value>| s[0]["history"].as_array().unwrap().len();
    assert!(history_len(&snapshots[2]) >= 2);
    assert!(snapshots.iter().all(|s| history_len(s) <= 5));

    server.stop().await.unwrap();
    assert_eq!(server.hub().subscriber_count(), 0);
}
