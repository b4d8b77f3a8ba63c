//! Integration tests for the hook lifecycle.
//!
//! These tests drive `HookEngine` end-to-end through `MockRecordProvider` in
//! both delivery modes: start/stop idempotence, unwinding of every startup
//! failure, resource accounting, and trailing-event suppression.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use inputhook::infrastructure::record::mock::{FailPoint, MockHandle, MockRecordProvider};
use inputhook::{ChannelListener, EngineSettings, HookEngine, HookError, HookState};
use inputhook_core::{EventKind, NativeEvent, RawEvent, RawMotionEvent};

const WAIT: Duration = Duration::from_secs(5);

fn motion(time_ms: u64) -> RawEvent {
    RawEvent::Motion(RawMotionEvent { state: 0, root_x: 10, root_y: 20, time_ms })
}

fn engine_with(
    provider: MockRecordProvider,
) -> (HookEngine<MockRecordProvider>, MockHandle, Receiver<NativeEvent>) {
    let handle = provider.handle();
    let (listener, events) = ChannelListener::new();
    let engine = HookEngine::new(provider, Arc::new(listener), EngineSettings::default());
    (engine, handle, events)
}

fn providers() -> Vec<(&'static str, MockRecordProvider)> {
    vec![
        ("blocking", MockRecordProvider::blocking()),
        ("polling", MockRecordProvider::polling(Some(Duration::from_millis(1)))),
    ]
}

fn assert_released(handle: &MockHandle, mode: &str) {
    assert_eq!(handle.open_connections(), 0, "{mode}: connections leaked");
    assert_eq!(handle.live_contexts(), 0, "{mode}: contexts leaked");
    assert_eq!(handle.live_ranges(), 0, "{mode}: ranges leaked");
}

// ── Start / stop ──────────────────────────────────────────────────────────────

#[test]
fn test_start_then_stop_in_both_modes() {
    for (mode, provider) in providers() {
        // Arrange
        let (engine, handle, _events) = engine_with(provider);

        // Act
        engine.start().unwrap_or_else(|e| panic!("{mode}: start failed: {e}"));
        let running = engine.is_running();
        let held = (handle.open_connections(), handle.live_contexts(), handle.live_ranges());
        engine.stop().unwrap_or_else(|e| panic!("{mode}: stop failed: {e}"));

        // Assert
        assert!(running, "{mode}");
        assert_eq!(held, (2, 1, 0), "{mode}: two connections, one context, range released");
        assert!(!engine.is_running(), "{mode}");
        assert_eq!(engine.state(), HookState::Stopped, "{mode}");
        assert_released(&handle, mode);
    }
}

#[test]
fn test_start_while_running_is_rejected_without_new_worker() {
    let (engine, handle, _events) = engine_with(MockRecordProvider::blocking());
    engine.start().expect("first start");

    let second = engine.start();

    assert!(matches!(second, Err(HookError::AlreadyRunning)));
    assert_eq!(handle.enable_calls(), 1);
    assert_eq!(handle.open_connections(), 2);
    assert!(engine.is_running());
    engine.stop().expect("stop");
}

#[test]
fn test_stop_when_not_running_is_a_no_op() {
    let (engine, handle, _events) = engine_with(MockRecordProvider::blocking());

    assert!(matches!(engine.stop(), Err(HookError::NotRunning)));
    assert_eq!(engine.state(), HookState::Stopped);
    assert_eq!(handle.enable_calls(), 0);
}

#[test]
fn test_repeated_start_stop_cycles_leak_nothing() {
    for (mode, provider) in providers() {
        let (engine, handle, events) = engine_with(provider);

        for cycle in 0..2u64 {
            engine.start().expect("start");
            assert!(handle.inject(motion(cycle)), "{mode}: context enabled");
            let event = events.recv_timeout(WAIT).expect("event delivered");
            assert_eq!(event.time_ms, cycle, "{mode}");
            engine.stop().expect("stop");
        }

        assert_eq!(engine.state(), HookState::Stopped, "{mode}");
        assert_eq!(handle.enable_calls(), 2, "{mode}");
        assert_released(&handle, mode);
    }
}

#[test]
fn test_rapid_cycles_with_busy_polling_leak_nothing() {
    let (engine, handle, _events) = engine_with(MockRecordProvider::polling(None));

    for _ in 0..200 {
        engine.start().expect("start");
        engine.stop().expect("stop");
    }

    assert_eq!(engine.state(), HookState::Stopped);
    assert_released(&handle, "polling");
}

#[test]
fn test_dropping_running_engine_stops_it() {
    let (engine, handle, _events) = engine_with(MockRecordProvider::blocking());
    engine.start().expect("start");

    drop(engine);

    assert_released(&handle, "blocking");
}

// ── Provider-side end of delivery ─────────────────────────────────────────────

fn wait_for_state(engine: &HookEngine<MockRecordProvider>, expected: HookState) {
    let deadline = Instant::now() + WAIT;
    while engine.state() != expected {
        assert!(Instant::now() < deadline, "state stuck at {:?}", engine.state());
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_stop_after_delivery_ended_reports_not_running() {
    for (mode, provider) in providers() {
        // Arrange
        let (engine, handle, _events) = engine_with(provider);
        engine.start().expect("start");

        // Act
        assert!(handle.end_delivery(), "{mode}");
        wait_for_state(&engine, HookState::Stopped);
        let stopped = engine.stop();

        // Assert
        assert!(matches!(stopped, Err(HookError::NotRunning)), "{mode}: {stopped:?}");
        assert!(!engine.is_running(), "{mode}");
        assert_released(&handle, mode);
        assert!(matches!(engine.stop(), Err(HookError::NotRunning)), "{mode}");
    }
}

#[test]
fn test_start_after_delivery_ended_begins_new_session() {
    let (engine, handle, events) = engine_with(MockRecordProvider::blocking());
    engine.start().expect("start");
    assert!(handle.end_delivery());
    wait_for_state(&engine, HookState::Stopped);

    engine.start().expect("restart");
    assert!(handle.inject(motion(3)));

    assert_eq!(events.recv_timeout(WAIT).expect("event").time_ms, 3);
    assert_eq!(handle.open_connections(), 2, "previous session reaped");
    engine.stop().expect("stop");
    assert_released(&handle, "blocking");
}

// ── Startup failures ──────────────────────────────────────────────────────────

#[test]
fn test_every_startup_failure_unwinds_to_stopped() {
    let cases = [
        FailPoint::OpenControl,
        FailPoint::OpenData,
        FailPoint::QueryVersion,
        FailPoint::KeyTable,
        FailPoint::AllocRange,
        FailPoint::CreateContext,
        FailPoint::Enable,
    ];

    for (mode, _) in providers() {
        for point in cases {
            // Arrange
            let provider = match mode {
                "blocking" => MockRecordProvider::blocking(),
                _ => MockRecordProvider::polling(Some(Duration::from_millis(1))),
            };
            let (engine, handle, _events) = engine_with(provider.failing_at(point));

            // Act
            let result = engine.start();

            // Assert
            let err = result.expect_err("start must fail");
            let expected = match point {
                FailPoint::OpenControl | FailPoint::OpenData => {
                    matches!(err, HookError::Connection { .. })
                }
                FailPoint::QueryVersion => matches!(err, HookError::ExtensionUnavailable(_)),
                FailPoint::KeyTable | FailPoint::AllocRange | FailPoint::CreateContext => {
                    matches!(err, HookError::ResourceAllocation(_))
                }
                FailPoint::Enable => matches!(err, HookError::ContextEnable(_)),
                FailPoint::Disable => unreachable!(),
            };
            assert!(expected, "{mode}/{point:?}: unexpected error {err:?}");
            assert!(!engine.is_running(), "{mode}/{point:?}");
            assert_eq!(engine.state(), HookState::Stopped, "{mode}/{point:?}");
            assert_released(&handle, mode);
        }
    }
}

#[test]
fn test_connection_failure_spawns_no_worker() {
    let (engine, handle, _events) =
        engine_with(MockRecordProvider::blocking().failing_at(FailPoint::OpenControl));

    let result = engine.start();

    assert!(matches!(result, Err(HookError::Connection { ref display }) if display == "mock"));
    assert_eq!(handle.enable_calls(), 0);
    assert!(matches!(engine.stop(), Err(HookError::NotRunning)));
}

#[test]
fn test_start_succeeds_after_failure_is_cleared() {
    let (engine, handle, _events) =
        engine_with(MockRecordProvider::blocking().failing_at(FailPoint::CreateContext));
    assert!(engine.start().is_err());

    handle.clear_failure();

    engine.start().expect("start after clearing failure");
    assert!(engine.is_running());
    engine.stop().expect("stop");
    assert_released(&handle, "blocking");
}

// ── Shutdown failures ─────────────────────────────────────────────────────────

#[test]
fn test_failed_disable_keeps_session_for_retry() {
    for (mode, provider) in providers() {
        // Arrange
        let (engine, handle, events) = engine_with(provider);
        engine.start().expect("start");
        handle.fail_at(FailPoint::Disable);

        // Act
        let first = engine.stop();

        // Assert: still capturing
        assert!(matches!(first, Err(HookError::ContextDisable(_))), "{mode}: {first:?}");
        assert!(engine.is_running(), "{mode}");
        assert!(handle.inject(motion(7)), "{mode}");
        assert_eq!(events.recv_timeout(WAIT).expect("event").time_ms, 7, "{mode}");

        handle.clear_failure();
        engine.stop().expect("retry stop");
        assert_released(&handle, mode);
    }
}

// ── Trailing events ───────────────────────────────────────────────────────────

#[test]
fn test_events_after_stop_begins_are_dropped() {
    for (mode, provider) in providers() {
        // Arrange: the provider delivers one more record after the context is disabled.
        let (engine, handle, events) = engine_with(provider.with_trailing_event(motion(99)));
        engine.start().expect("start");
        assert!(handle.inject(motion(1)), "{mode}");
        let live = events.recv_timeout(WAIT).expect("live event");

        // Act
        engine.stop().expect("stop");

        // Assert
        assert_eq!(live.kind, EventKind::MouseMoved, "{mode}");
        assert_eq!(live.time_ms, 1, "{mode}");
        assert_eq!(events.try_iter().count(), 0, "{mode}: trailing record reached the listener");
        assert!(!handle.inject(motion(2)), "{mode}: no context after stop");
        assert_released(&handle, mode);
    }
}

#[test]
fn test_events_are_delivered_in_capture_order() {
    for (mode, provider) in providers() {
        let (engine, handle, events) = engine_with(provider);
        engine.start().expect("start");

        for t in 0..50 {
            assert!(handle.inject(motion(t)), "{mode}");
        }
        let times: Vec<u64> = (0..50)
            .map(|_| events.recv_timeout(WAIT).expect("event delivered").time_ms)
            .collect();
        engine.stop().expect("stop");

        assert_eq!(times, (0..50).collect::<Vec<_>>(), "{mode}");
    }
}
