//! Bridge Tests
//!
//! Tests for exclusive state access and lockstep advancing.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use simtraci::{SimBridge, SimDriver, Simulation, TraciError};

/// Minimal simulation: a step counter plus a scratch value
struct Counter {
    steps: u64,
    value: u64,
}

impl Counter {
    fn new() -> Self {
        Self { steps: 0, value: 0 }
    }
}

impl Simulation for Counter {
    fn step(&mut self) {
        self.steps += 1;
    }

    fn sim_time(&self) -> f64 {
        self.steps as f64 * 0.5
    }

    fn step_length(&self) -> f64 {
        0.5
    }
}

// =============================================================================
// Exclusive Access
// =============================================================================

#[test]
fn test_concurrent_with_state_loses_no_updates() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for _ in 0..1000 {
                    // read-modify-write split in two so a missing lock would show
                    bridge.with_state(|c| {
                        let current = c.value;
                        thread::yield_now();
                        c.value = current + 1;
                    });
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(bridge.with_state(|c| c.value), 2000);
}

#[test]
fn test_with_state_while_driver_runs() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();

    let stepper = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || {
            for _ in 0..200 {
                bridge.advance(1, |_| ()).unwrap();
            }
        })
    };

    for _ in 0..200 {
        bridge.with_state(|c| c.value += 1);
    }
    stepper.join().unwrap();

    assert_eq!(bridge.with_state(|c| (c.steps, c.value)), (200, 200));
    driver.shutdown();
}

// =============================================================================
// Advancing
// =============================================================================

#[test]
fn test_advance_reaches_step_boundary() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();

    let steps = bridge.advance(3, |c| c.steps).unwrap();
    assert_eq!(steps, 3);
    assert_eq!(bridge.steps_completed(), 3);

    let time = bridge.advance(1, |c| c.sim_time()).unwrap();
    assert_eq!(time, 2.0);

    driver.shutdown();
}

#[test]
fn test_lockstep_driver_waits_for_requests() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(bridge.steps_completed(), 0);

    driver.shutdown();
}

#[test]
fn test_concurrent_advance_counts_every_request() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for _ in 0..25 {
                    bridge.advance(2, |_| ()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(bridge.steps_completed(), 200);
    driver.shutdown();
}

#[test]
fn test_advance_past_step_counter_limit_fails() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();

    bridge.advance(1, |_| ()).unwrap();
    match bridge.advance(u64::MAX, |_| ()) {
        Err(TraciError::Protocol(msg)) => assert!(msg.contains("more steps")),
        other => panic!("Expected Protocol error, got {:?}", other),
    }

    // nothing was scheduled by the rejected request
    assert_eq!(bridge.advance(1, |c| c.steps).unwrap(), 2);
    driver.shutdown();
}

#[test]
fn test_free_running_driver_advances_alone() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), Some(Duration::from_millis(5))).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.steps_completed() < 3 {
        assert!(Instant::now() < deadline, "free-running driver did not step");
        thread::sleep(Duration::from_millis(5));
    }

    driver.shutdown();
}

// =============================================================================
// Driver Lifecycle
// =============================================================================

#[test]
fn test_advance_without_driver_fails() {
    let bridge = SimBridge::new(Counter::new());
    assert!(!bridge.is_driver_running());
    match bridge.advance(1, |_| ()) {
        Err(TraciError::DriverStopped) => {}
        other => panic!("Expected DriverStopped, got {:?}", other),
    }
}

#[test]
fn test_advance_after_shutdown_fails() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();
    assert!(bridge.is_driver_running());

    driver.shutdown();
    assert!(!bridge.is_driver_running());
    assert!(matches!(bridge.advance(1, |_| ()), Err(TraciError::DriverStopped)));
}

#[test]
fn test_second_driver_rejected() {
    let bridge = Arc::new(SimBridge::new(Counter::new()));
    let driver = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();

    assert!(SimDriver::spawn(Arc::clone(&bridge), None).is_err());

    drop(driver);
    let again = SimDriver::spawn(Arc::clone(&bridge), None).unwrap();
    again.shutdown();
}
