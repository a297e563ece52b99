//! End-to-end relay scenarios: command dispatch, state streaming and the
//! server lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_test::assert_ok;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use kart_telemetry_server::config::{BroadcastMode, Config};
use kart_telemetry_server::host::{self, SessionKind};
use kart_telemetry_server::relay::{RelayCore, RelayServer, ServerError};
use kart_telemetry_server::vehicle::{Vehicle, VehicleInputs, VehicleState};
use kart_telemetry_server::ws::protocol::{StreamData, Vec3};

/// Vehicle with a fixed physical state that records applied inputs.
struct TestVehicle {
    state: VehicleState,
    applied: Arc<Mutex<Vec<VehicleInputs>>>,
}

impl TestVehicle {
    fn with_state(state: VehicleState) -> (Self, Arc<Mutex<Vec<VehicleInputs>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                state,
                applied: applied.clone(),
            },
            applied,
        )
    }
}

impl Vehicle for TestVehicle {
    fn state(&self) -> VehicleState {
        self.state
    }

    fn apply_inputs(&mut self, inputs: &VehicleInputs) {
        self.applied.lock().push(*inputs);
    }
}

fn connect_client(core: &RelayCore) -> mpsc::UnboundedReceiver<Message> {
    let (tx, rx) = mpsc::unbounded_channel();
    core.registry().add(Uuid::new_v4(), tx);
    rx
}

fn decode_frame(msg: Message) -> StreamData {
    match msg {
        Message::Text(json) => serde_json::from_str(&json).expect("valid telemetry frame"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        broadcast_mode: BroadcastMode::OnRequest,
        broadcast_interval_ms: 1000,
        tick_rate: 50,
    }
}

#[test]
fn state_request_yields_exactly_one_frame_with_current_state() {
    let core = RelayCore::new(BroadcastMode::OnRequest);

    let (vehicle, _applied) = TestVehicle::with_state(VehicleState {
        position: Vec3::new(1.0, 2.0, 3.0),
        rotation_euler: Vec3::new(0.0, 90.0, 0.0),
        local_velocity: Vec3::new(0.0, 0.0, 5.0),
        local_angular_velocity: Vec3::ZERO,
    });
    host::on_vehicle_spawned(&core, SessionKind::Single, Box::new(vehicle));

    let mut client = connect_client(&core);

    core.handle_frame(br#"{"cmd":"STATE_REQUEST"}"#);
    core.tick();

    let frame = decode_frame(client.try_recv().expect("one frame within one tick"));
    assert_eq!(frame.state.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(frame.state.rotation, Vec3::new(0.0, 90.0, 0.0));
    assert_eq!(frame.state.local_velocity, Vec3::new(0.0, 0.0, 5.0));
    assert_eq!(frame.state.local_angular_velocity, Vec3::ZERO);

    assert!(client.try_recv().is_err(), "exactly one frame");
}

#[test]
fn action_commands_coalesce_and_apply_on_the_next_tick() {
    let core = RelayCore::new(BroadcastMode::OnRequest);

    let (vehicle, applied) = TestVehicle::with_state(VehicleState::default());
    host::on_vehicle_spawned(&core, SessionKind::Single, Box::new(vehicle));

    let mut client = connect_client(&core);

    // Burst of actions with a state request in the middle: the request is
    // handled out-of-band, only the latest action reaches the vehicle.
    core.handle_frame(br#"{"cmd":"ACTION","steer":0.1}"#);
    core.handle_frame(br#"{"cmd":"ACTION","steer":0.2}"#);
    core.handle_frame(br#"{"cmd":"STATE_REQUEST"}"#);
    core.handle_frame(br#"{"cmd":"ACTION","steer":0.3,"brake":1.0,"reset":0.3}"#);
    core.tick();

    let applied = applied.lock();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].steer_axis, 0.3);
    assert!(applied[0].brake_held);
    assert_eq!(applied[0].brake_axis, 1.0);
    assert!(applied[0].reset_triggered);

    assert!(client.try_recv().is_ok(), "state request still answered");
    assert!(client.try_recv().is_err());
}

#[test]
fn multi_occupant_session_never_streams() {
    let core = RelayCore::new(BroadcastMode::OnRequest);

    let (vehicle, _applied) = TestVehicle::with_state(VehicleState::default());
    host::on_vehicle_spawned(&core, SessionKind::Multi, Box::new(vehicle));

    let mut client = connect_client(&core);
    core.handle_frame(br#"{"cmd":"STATE_REQUEST"}"#);
    core.tick();

    assert!(!core.target().is_bound());
    assert!(client.try_recv().is_err());
}

#[tokio::test]
async fn websocket_client_receives_exactly_one_frame_per_state_request() {
    let server = RelayServer::new(test_config());
    let addr = server.start().await.expect("bind ephemeral port");

    let (vehicle, _applied) = TestVehicle::with_state(VehicleState {
        position: Vec3::new(1.0, 2.0, 3.0),
        rotation_euler: Vec3::new(0.0, 90.0, 0.0),
        local_velocity: Vec3::new(0.0, 0.0, 5.0),
        local_angular_velocity: Vec3::ZERO,
    });
    host::on_vehicle_spawned(&server.core(), SessionKind::Single, Box::new(vehicle));

    let (mut socket, _response) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket handshake");

    socket
        .send(WsMessage::Text(r#"{"cmd":"STATE_REQUEST"}"#.to_string()))
        .await
        .expect("send state request");

    let frame = timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("a frame within the tick loop's next pass")
        .expect("stream open")
        .expect("frame read");
    let json = match frame {
        WsMessage::Text(json) => json,
        other => panic!("expected a text frame, got {other:?}"),
    };
    let data: StreamData = serde_json::from_str(&json).expect("valid telemetry frame");
    assert_eq!(data.state.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(data.state.rotation, Vec3::new(0.0, 90.0, 0.0));
    assert_eq!(data.state.local_velocity, Vec3::new(0.0, 0.0, 5.0));
    assert_eq!(data.state.local_angular_velocity, Vec3::ZERO);

    // One request, one frame: nothing else shows up.
    assert!(
        timeout(Duration::from_millis(200), socket.next())
            .await
            .is_err(),
        "exactly one frame per state request"
    );

    server.stop();
}

#[tokio::test]
async fn websocket_binary_action_frames_reach_the_vehicle() {
    let server = RelayServer::new(test_config());
    let addr = server.start().await.expect("bind ephemeral port");

    let (vehicle, applied) = TestVehicle::with_state(VehicleState::default());
    host::on_vehicle_spawned(&server.core(), SessionKind::Single, Box::new(vehicle));

    let (mut socket, _response) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket handshake");

    socket
        .send(WsMessage::Binary(
            br#"{"cmd":"ACTION","steer":0.4,"brake":1.0}"#.to_vec(),
        ))
        .await
        .expect("send action");

    // The command is applied on the next fixed tick.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if !applied.lock().is_empty() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "action not applied within the deadline"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let applied = applied.lock();
    assert_eq!(applied[0].steer_axis, 0.4);
    assert!(applied[0].brake_held);

    server.stop();
}

#[tokio::test]
async fn server_lifecycle_start_stop() {
    let server = RelayServer::new(test_config());

    let addr = tokio_test::assert_ok!(server.start().await);
    assert_ne!(addr.port(), 0);
    assert_eq!(server.local_addr(), Some(addr));

    // Second start while listening is rejected.
    match server.start().await {
        Err(ServerError::AlreadyListening) => {}
        other => panic!("expected AlreadyListening, got {other:?}"),
    }

    server.stop();
    assert_eq!(server.local_addr(), None);

    // stop is idempotent, and safe on a server that never started.
    server.stop();
    RelayServer::new(test_config()).stop();
}

#[tokio::test]
async fn double_start_on_a_fixed_port_reports_already_listening() {
    // Reserve a concrete free port, then configure the server with it so
    // both starts target the same fixed address.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("probe bind");
    let addr = probe.local_addr().expect("probe addr");
    drop(probe);

    let mut config = test_config();
    config.server_addr = addr;
    let server = RelayServer::new(config);

    server.start().await.expect("bind fixed port");

    // The guard must fire before any second bind is attempted; a bind
    // failure here would mean the listener was contested first.
    match server.start().await {
        Err(ServerError::AlreadyListening) => {}
        other => panic!("expected AlreadyListening, got {other:?}"),
    }

    server.stop();
}

#[tokio::test]
async fn bind_conflict_surfaces_as_a_bind_error() {
    let first = RelayServer::new(test_config());
    let addr = first.start().await.expect("bind ephemeral port");

    let mut conflicting = test_config();
    conflicting.server_addr = addr;
    let second = RelayServer::new(conflicting);

    match second.start().await {
        Err(ServerError::Bind { .. }) => {}
        other => panic!("expected Bind error, got {other:?}"),
    }

    first.stop();
}
