//! Tests for `EventEmitter<T>`.

use bookmark_sync::reactive::EventEmitter;
use std::sync::{Arc, Mutex};

fn make_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// ============================================================================
// Subscription
// ============================================================================

#[test]
fn emit_calls_listeners_in_registration_order() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    let log = make_log();

    for name in ["a", "b", "c"] {
        let log = Arc::clone(&log);
        emitter.on(move |e| log.lock().unwrap().push(format!("{name}:{e}")));
    }

    assert_eq!(emitter.emit(&1), 3);
    assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "c:1"]);
}

#[test]
fn off_removes_listener_and_reports_presence() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    let log = make_log();
    let sink = Arc::clone(&log);

    let id = emitter.on(move |e| sink.lock().unwrap().push(format!("{e}")));
    assert!(emitter.off(id));
    assert!(!emitter.off(id), "second off is a no-op");

    emitter.emit(&99);
    assert!(log.lock().unwrap().is_empty());
    assert!(emitter.is_empty());
}

#[test]
fn clear_drops_every_listener() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    emitter.on(|_| {});
    emitter.on(|_| {});
    assert_eq!(emitter.len(), 2);

    emitter.clear();
    assert_eq!(emitter.emit(&1), 0);
}

// ============================================================================
// Snapshot-on-emit
// ============================================================================

#[test]
fn listener_added_during_emit_runs_next_round() {
    let emitter: Arc<EventEmitter<i32>> = Arc::new(EventEmitter::new());
    let log = make_log();

    {
        let emitter2 = Arc::clone(&emitter);
        let log = Arc::clone(&log);
        emitter.on(move |e| {
            if *e == 1 {
                let log = Arc::clone(&log);
                emitter2.on(move |e| log.lock().unwrap().push(format!("late:{e}")));
            }
        });
    }

    emitter.emit(&1);
    assert!(log.lock().unwrap().is_empty());

    emitter.emit(&2);
    assert_eq!(*log.lock().unwrap(), vec!["late:2"]);
}

// ============================================================================
// Panic isolation
// ============================================================================

#[test]
fn panicking_listener_does_not_stop_the_rest() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    let log = make_log();

    emitter.on(|_| panic!("listener failure"));
    {
        let log = Arc::clone(&log);
        emitter.on(move |e| log.lock().unwrap().push(format!("ok:{e}")));
    }

    assert_eq!(emitter.emit(&7), 1);
    assert_eq!(emitter.emit(&8), 1, "emitter stays usable");
    assert_eq!(*log.lock().unwrap(), vec!["ok:7", "ok:8"]);
}
