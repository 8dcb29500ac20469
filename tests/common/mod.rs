//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use gascal_rs::backend::{FrontendReceiver, Notification};
use std::time::{Duration, Instant};

/// Upper bound for waiting on backend notifications
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Collect notifications until one matches `pred` or the timeout expires.
///
/// Returns everything received, the matching notification last. Panics on
/// timeout with the notifications seen so far.
pub fn wait_for(
    frontend: &FrontendReceiver,
    mut pred: impl FnMut(&Notification) -> bool,
) -> Vec<Notification> {
    let deadline = Instant::now() + test_timeout();
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        match frontend.receiver.recv_timeout(Duration::from_millis(20)) {
            Ok(msg) => {
                let done = pred(&msg);
                seen.push(msg);
                if done {
                    return seen;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }
    panic!("Timed out waiting for notification; received {:?}", seen);
}

/// Poll `cond` until it holds or the timeout expires
pub fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + test_timeout();
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("Condition not met within {:?}", test_timeout());
}
