//! Session Tests
//!
//! End-to-end tests over loopback TCP: server, sessions, and the client.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use simtraci::handler::person::PersonVar;
use simtraci::handler::simulation::SimulationVar;
use simtraci::protocol::{
    encode_commands, encode_frame, parse_responses, read_frame, write_frame, Command,
    ResponseBody, ResultCode, TraciCmd, TypedValue, Vec2, MAX_FRAME_SIZE,
};
use simtraci::world::{Pedestrian, World};
use simtraci::{
    default_registry, Config, Router, Server, ShutdownHandle, SimBridge, SimDriver, TraciClient,
};
use tempfile::TempDir;

// =============================================================================
// Test Server
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<()>>,
    driver: Option<SimDriver<World>>,
    dir: TempDir,
}

impl TestServer {
    fn start(world: World) -> Self {
        Self::start_with_grace(world, 200)
    }

    fn start_with_grace(world: World, shutdown_grace_ms: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(SimBridge::new(world));
        let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();
        let router = Arc::new(Router::new(
            Arc::new(default_registry()),
            bridge,
            dir.path().join("data"),
        ));

        let config = Config::builder()
            .listen_addr("127.0.0.1:0")
            .max_connections(4)
            .shutdown_grace_ms(shutdown_grace_ms)
            .build();
        let server = Server::bind(config, router).unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            shutdown,
            handle: Some(handle),
            driver: Some(driver),
            dir,
        }
    }

    fn client(&self) -> TraciClient {
        TraciClient::connect(self.addr).unwrap()
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn stop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        if let Some(driver) = self.driver.take() {
            driver.shutdown();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn two_pedestrians() -> World {
    let mut world = World::new(0.4);
    world.add_pedestrian(Pedestrian::new(1, Vec2::new(0.0, 0.0), 1.0, Vec2::new(10.0, 0.0)));
    world.add_pedestrian(Pedestrian::new(2, Vec2::new(0.0, 5.0), 1.0, Vec2::new(0.0, 10.0)));
    world
}

fn sim_time(client: &mut TraciClient) -> f64 {
    match client
        .get(TraciCmd::GetSimulationValue, SimulationVar::Time.id(), "")
        .unwrap()
    {
        TypedValue::Double(t) => t,
        other => panic!("Expected double, got {:?}", other),
    }
}

// =============================================================================
// Basic Commands
// =============================================================================

#[test]
fn test_get_version() {
    let server = TestServer::start(World::new(0.4));
    let mut client = server.client();

    let info = client.get_version().unwrap();
    assert_eq!(info.api_version, 20);
    assert!(info.identifier.contains("simtraci"));
}

#[test]
fn test_batched_commands_answered_in_order() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    let responses = client
        .send(&[
            Command::GetVersion,
            Command::get(TraciCmd::GetPersonValue, PersonVar::Count.id(), ""),
            Command::get(TraciCmd::GetPersonValue, PersonVar::Pos2D.id(), "2"),
        ])
        .unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].cmd(), TraciCmd::GetVersion);
    assert_eq!(responses[1].value(), Some(&TypedValue::Integer(2)));
    assert_eq!(
        responses[2].value(),
        Some(&TypedValue::Pos2D(Vec2::new(0.0, 5.0)))
    );
}

#[test]
fn test_error_does_not_end_session() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    let response = client
        .request(Command::get(TraciCmd::GetPersonValue, PersonVar::Speed.id(), "99"))
        .unwrap();
    assert_eq!(response.result(), ResultCode::Error);
    assert!(!response.description().is_empty());

    let response = client
        .request(Command::get(TraciCmd::GetPersonValue, PersonVar::Color.id(), "1"))
        .unwrap();
    assert_eq!(response.result(), ResultCode::NotImplemented);

    let count = client
        .get(TraciCmd::GetPersonValue, PersonVar::Count.id(), "")
        .unwrap();
    assert_eq!(count, TypedValue::Integer(2));
}

#[test]
fn test_sim_step_reaches_target_time() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    let response = client.next_step(2.0).unwrap();
    assert!(response.is_ok());
    assert!((sim_time(&mut client) - 2.0).abs() < 1e-9);

    // a target in the past still advances one step
    client.next_step(0.0).unwrap();
    assert!((sim_time(&mut client) - 2.4).abs() < 1e-9);
}

#[test]
fn test_sim_step_to_unreachable_target_is_error() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();
    client.next_step(0.0).unwrap();

    for target_time in [f64::INFINITY, f64::NAN, 1e300] {
        let response = client.next_step(target_time).unwrap();
        assert_eq!(response.result(), ResultCode::Error);
        assert!(response.description().contains("out of reach"));
    }

    // session and simulation are unaffected
    assert!((sim_time(&mut client) - 0.4).abs() < 1e-9);
    assert!(client.next_step(0.0).unwrap().is_ok());
    assert!((sim_time(&mut client) - 0.8).abs() < 1e-9);
}

#[test]
fn test_set_is_visible_to_other_sessions() {
    let server = TestServer::start(two_pedestrians());
    let mut writer = server.client();
    let mut reader = server.client();

    let response = writer
        .set(
            TraciCmd::SetPersonState,
            PersonVar::Pos2D.id(),
            "1",
            TypedValue::Pos2D(Vec2::new(7.0, 7.0)),
        )
        .unwrap();
    assert!(response.is_ok());

    let position = reader
        .get(TraciCmd::GetPersonValue, PersonVar::Pos2D.id(), "1")
        .unwrap();
    assert_eq!(position, TypedValue::Pos2D(Vec2::new(7.0, 7.0)));
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[test]
fn test_close_ends_session() {
    let server = TestServer::start(World::new(0.4));
    let mut stream = TcpStream::connect(server.addr).unwrap();

    let payload = encode_commands(&[Command::Close, Command::GetVersion]).unwrap();
    write_frame(&mut stream, &payload).unwrap();

    let reply = read_frame(&mut stream, MAX_FRAME_SIZE).unwrap();
    let responses = parse_responses(reply).unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].cmd(), TraciCmd::Close);
    assert!(responses[0].is_ok());

    let err = read_frame(&mut stream, MAX_FRAME_SIZE).unwrap_err();
    assert!(err.is_disconnect());
}

#[test]
fn test_client_close_helper() {
    let server = TestServer::start(World::new(0.4));
    let client = server.client();
    assert!(client.close().unwrap().is_ok());
}

#[test]
fn test_malformed_frame_closes_only_that_client() {
    let server = TestServer::start(two_pedestrians());
    let mut healthy = server.client();
    let mut broken = TcpStream::connect(server.addr).unwrap();

    // unit declares 9 content bytes but carries 1
    broken.write_all(&encode_frame(&[10, 0x00])).unwrap();
    let err = read_frame(&mut broken, MAX_FRAME_SIZE).unwrap_err();
    assert!(err.is_disconnect());

    assert_eq!(healthy.get_version().unwrap().api_version, 20);
}

#[test]
fn test_unknown_opcode_closes_session() {
    let server = TestServer::start(World::new(0.4));
    let mut stream = TcpStream::connect(server.addr).unwrap();

    stream.write_all(&encode_frame(&[2, 0x55])).unwrap();
    assert!(read_frame(&mut stream, MAX_FRAME_SIZE).is_err());
}

#[test]
fn test_shutdown_ends_idle_sessions_without_waiting_for_grace() {
    let mut server = TestServer::start_with_grace(World::new(0.4), 30_000);
    let mut first = server.client();
    let mut second = server.client();
    first.get_version().unwrap();
    second.get_version().unwrap();

    let started = Instant::now();
    server.stop();
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "idle sessions held shutdown for {:?}",
        started.elapsed()
    );

    assert!(first.get_version().is_err());
    assert!(second.get_version().is_err());
}

#[test]
fn test_shutdown_closes_listener() {
    let mut server = TestServer::start(World::new(0.4));
    server.client().get_version().unwrap();

    server.stop();
    assert!(TcpStream::connect(server.addr).is_err());
}

// =============================================================================
// Subscriptions
// =============================================================================

#[test]
fn test_subscribe_returns_current_values() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    let response = client
        .subscribe(TraciCmd::SubPersonValue, "1", vec![PersonVar::Pos2D.id()])
        .unwrap();
    assert!(response.is_ok());
    match &response.body {
        ResponseBody::Subscription(result) => {
            assert_eq!(result.cmd, TraciCmd::ResponseSubPersonValue);
            assert_eq!(result.element_id, "1");
            assert_eq!(
                result.value_of(PersonVar::Pos2D.id()),
                Some(&TypedValue::Pos2D(Vec2::new(0.0, 0.0)))
            );
        }
        other => panic!("Expected subscription body, got {:?}", other),
    }
}

#[test]
fn test_subscriptions_reported_in_registration_order() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    client
        .subscribe(TraciCmd::SubPersonValue, "2", vec![PersonVar::Pos2D.id()])
        .unwrap();
    client
        .subscribe(TraciCmd::SubPersonValue, "1", vec![PersonVar::Pos2D.id(), PersonVar::Speed.id()])
        .unwrap();
    client
        .subscribe(TraciCmd::SubSimulationValue, "", vec![SimulationVar::Time.id()])
        .unwrap();

    let response = client.next_step(0.0).unwrap();
    let results = response.subscriptions();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].element_id, "2");
    assert_eq!(results[1].element_id, "1");
    assert_eq!(results[2].cmd, TraciCmd::ResponseSubSimulationValue);

    match results[1].value_of(PersonVar::Pos2D.id()) {
        Some(TypedValue::Pos2D(p)) => assert!((p.x - 0.4).abs() < 1e-9),
        other => panic!("Expected position, got {:?}", other),
    }
    match results[2].value_of(SimulationVar::Time.id()) {
        Some(TypedValue::Double(t)) => assert!((t - 0.4).abs() < 1e-9),
        other => panic!("Expected time, got {:?}", other),
    }
}

#[test]
fn test_resubscribe_replaces_in_place() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    client
        .subscribe(TraciCmd::SubPersonValue, "1", vec![PersonVar::Pos2D.id()])
        .unwrap();
    client
        .subscribe(TraciCmd::SubPersonValue, "2", vec![PersonVar::Pos2D.id()])
        .unwrap();
    client
        .subscribe(TraciCmd::SubPersonValue, "1", vec![PersonVar::Speed.id()])
        .unwrap();

    let response = client.next_step(0.0).unwrap();
    let results = response.subscriptions();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].element_id, "1");
    assert!(results[0].value_of(PersonVar::Speed.id()).is_some());
    assert!(results[0].value_of(PersonVar::Pos2D.id()).is_none());
}

#[test]
fn test_unsubscribe_with_empty_variable_list() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    client
        .subscribe(TraciCmd::SubPersonValue, "1", vec![PersonVar::Pos2D.id()])
        .unwrap();
    let response = client
        .subscribe(TraciCmd::SubPersonValue, "1", Vec::new())
        .unwrap();
    assert!(response.is_ok());
    assert!(client.next_step(0.0).unwrap().subscriptions().is_empty());

    let response = client
        .subscribe(TraciCmd::SubPersonValue, "1", Vec::new())
        .unwrap();
    assert_eq!(response.result(), ResultCode::Error);
}

#[test]
fn test_subscription_errors_are_per_variable() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    client
        .subscribe(TraciCmd::SubPersonValue, "42", vec![PersonVar::Pos2D.id()])
        .unwrap();
    let response = client.next_step(0.0).unwrap();
    let result = &response.subscriptions()[0];
    assert_eq!(result.values[0].status, ResultCode::Error);
    assert!(matches!(result.values[0].value, TypedValue::String(_)));
}

#[test]
fn test_subscriptions_are_per_session() {
    let server = TestServer::start(two_pedestrians());
    let mut subscriber = server.client();
    let mut other = server.client();

    subscriber
        .subscribe(TraciCmd::SubPersonValue, "1", vec![PersonVar::Pos2D.id()])
        .unwrap();

    assert!(other.next_step(0.0).unwrap().subscriptions().is_empty());
    assert_eq!(subscriber.next_step(0.0).unwrap().subscriptions().len(), 1);
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_send_file_loads_scenario() {
    let server = TestServer::start(World::new(0.4));
    let mut client = server.client();

    let source = server.dir.path().join("corridor.scenario");
    std::fs::write(
        &source,
        "# corridor\nstep_length 0.2\npedestrian 7 0 0 1.0 5 0\npedestrian 8 1 1 1.0 5 1\n",
    )
    .unwrap();

    let response = client.send_file(&source).unwrap();
    assert!(response.is_ok(), "{}", response.description());
    assert!(server.data_dir().join("corridor.scenario").exists());

    let ids = client
        .get(TraciCmd::GetPersonValue, PersonVar::IdList.id(), "")
        .unwrap();
    assert_eq!(ids, TypedValue::StringList(vec!["7".to_string(), "8".to_string()]));

    client.next_step(0.0).unwrap();
    assert!((sim_time(&mut client) - 0.2).abs() < 1e-9);
}

#[test]
fn test_send_file_strips_directories() {
    let server = TestServer::start(World::new(0.4));
    let mut client = server.client();

    let response = client
        .request(Command::SendFile {
            name: "../../escape.scenario".to_string(),
            content: "pedestrian 1 0 0 1 1 1\n".to_string(),
        })
        .unwrap();
    assert!(response.is_ok());
    assert!(server.data_dir().join("escape.scenario").exists());
}

#[test]
fn test_invalid_scenario_is_error() {
    let server = TestServer::start(two_pedestrians());
    let mut client = server.client();

    let response = client
        .request(Command::SendFile {
            name: "bad.scenario".to_string(),
            content: "pedestrian one two\n".to_string(),
        })
        .unwrap();
    assert_eq!(response.result(), ResultCode::Error);

    // the running scenario is untouched
    let count = client
        .get(TraciCmd::GetPersonValue, PersonVar::Count.id(), "")
        .unwrap();
    assert_eq!(count, TypedValue::Integer(2));
}

#[test]
fn test_load_missing_file_is_error() {
    let server = TestServer::start(World::new(0.4));
    let mut client = server.client();

    let missing = server.dir.path().join("missing.scenario");
    let response = client.load(missing.to_str().unwrap()).unwrap();
    assert_eq!(response.result(), ResultCode::Error);
    assert!(client.get_version().is_ok());
}
