use priority_window::{
    AttributeValue, ChannelEmitter, Snapshot, SnapshotCause, WindowConfig, WindowRuntime,
};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

const PERIOD_MS: u64 = 50;
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn start() -> (
    WindowRuntime<String, ChannelEmitter<String>>,
    Receiver<Snapshot<String>>,
) {
    let config = WindowConfig::with_period(Duration::from_millis(PERIOD_MS)).window_id("runtime");
    let (emitter, receiver) = ChannelEmitter::channel();
    let runtime = WindowRuntime::start(&config, emitter).unwrap();
    (runtime, receiver)
}

fn send(runtime: &WindowRuntime<String, ChannelEmitter<String>>, key: &str, priority: i64) {
    runtime.on_event(
        Some(key.to_string()),
        Some(priority),
        vec![AttributeValue::from(key), AttributeValue::Long(priority)],
    );
}

fn collect(receiver: &Receiver<Snapshot<String>>, count: usize) -> Vec<Snapshot<String>> {
    (0..count)
        .map(|_| receiver.recv_timeout(RECV_TIMEOUT).expect("snapshot"))
        .collect()
}

#[test]
fn decays_on_the_configured_period() {
    let (runtime, receiver) = start();
    send(&runtime, "IBM", 1);
    send(&runtime, "IBM", 3);
    let snapshots = collect(&receiver, 6);
    let scores: Vec<i64> = snapshots.iter().map(|s| s.score).collect();
    assert_eq!(scores, vec![1, 4, 3, 2, 1, 0]);
    assert_eq!(snapshots[1].cause, SnapshotCause::Arrival);
    let anchor = snapshots[0].emitted_at_ms;
    for (step, snapshot) in snapshots[2..].iter().enumerate() {
        assert_eq!(snapshot.cause, SnapshotCause::Decay);
        assert!(snapshot.emitted_at_ms >= anchor + PERIOD_MS * (step as u64 + 1));
    }
    assert!(receiver
        .recv_timeout(Duration::from_millis(PERIOD_MS * 3))
        .is_err());
    assert!(runtime.wait_idle(Duration::from_millis(10)));
}

#[test]
fn zero_priority_never_arms() {
    let (runtime, receiver) = start();
    send(&runtime, "IBM", 0);
    assert_eq!(collect(&receiver, 1)[0].score, 0);
    assert_eq!(runtime.active_tasks(), 0);
    assert!(receiver
        .recv_timeout(Duration::from_millis(PERIOD_MS * 3))
        .is_err());
}

#[test]
fn filtered_events_emit_nothing() {
    let (runtime, receiver) = start();
    assert_eq!(runtime.on_event(None, Some(10), Vec::new()), None);
    assert_eq!(
        runtime.on_event(Some("IBM".to_string()), None, Vec::new()),
        None
    );
    assert!(receiver
        .recv_timeout(Duration::from_millis(PERIOD_MS * 2))
        .is_err());
    assert_eq!(runtime.metrics().events_filtered_total, 2);
}

#[test]
fn keys_decay_independently() {
    let (runtime, receiver) = start();
    send(&runtime, "IBM", 3);
    send(&runtime, "WSO2", 1);
    let snapshots = collect(&receiver, 6);
    let ibm: Vec<i64> = snapshots
        .iter()
        .filter(|s| s.key == "IBM")
        .map(|s| s.score)
        .collect();
    let wso2: Vec<i64> = snapshots
        .iter()
        .filter(|s| s.key == "WSO2")
        .map(|s| s.score)
        .collect();
    assert_eq!(ibm, vec![3, 2, 1, 0]);
    assert_eq!(wso2, vec![1, 0]);
    assert!(runtime.wait_idle(RECV_TIMEOUT));
}

#[test]
fn shutdown_cancels_outstanding_decay() {
    let (runtime, receiver) = start();
    send(&runtime, "IBM", 1_000);
    collect(&receiver, 2);
    runtime.shutdown();
    runtime.shutdown();
    let _buffered: Vec<_> = receiver.try_iter().collect();
    thread::sleep(Duration::from_millis(PERIOD_MS * 3));
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(runtime.active_tasks(), 0);
    assert!(runtime.inspect(|window| window.is_torn_down()));
    assert_eq!(runtime.on_event(Some("IBM".into()), Some(1), Vec::new()), None);
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn drop_releases_the_emitter() {
    let (runtime, receiver) = start();
    send(&runtime, "IBM", 1_000);
    collect(&receiver, 1);
    drop(runtime);
    let _buffered: Vec<_> = receiver.try_iter().collect();
    assert!(matches!(
        receiver.try_recv(),
        Err(TryRecvError::Disconnected)
    ));
}

#[test]
fn concurrent_ingest_and_decay_stay_serialized_per_key() {
    const THREADS: usize = 4;
    const EVENTS_PER_THREAD: usize = 500;
    let config = WindowConfig::with_period(Duration::from_millis(1)).window_id("contended");
    let (emitter, receiver) = ChannelEmitter::channel();
    let runtime = WindowRuntime::start(&config, emitter).unwrap();
    let shared = &runtime;

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(move || {
                for idx in 0..EVENTS_PER_THREAD {
                    let delta = if idx % 3 == 2 { -2 } else { 1 };
                    assert!(shared
                        .on_event(Some("IBM".to_string()), Some(delta), Vec::new())
                        .is_some());
                    if idx % 50 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            });
        }
    });
    assert!(runtime.wait_idle(Duration::from_secs(10)));

    let snapshots: Vec<Snapshot<String>> = receiver.try_iter().collect();
    let arrivals = snapshots
        .iter()
        .filter(|s| s.cause == SnapshotCause::Arrival)
        .count();
    assert_eq!(arrivals, THREADS * EVENTS_PER_THREAD);
    for pair in snapshots.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(next.score >= 0);
        if next.cause == SnapshotCause::Decay {
            assert!(prev.score > 0, "decay fired from a zero score");
            assert_eq!(next.score, prev.score - 1);
        }
    }
    assert_eq!(snapshots.last().map(|s| s.score), Some(0));
    assert_eq!(runtime.active_tasks(), 0);
}

#[test]
fn shutdown_racing_ingest_emits_nothing_afterwards() {
    for _ in 0..20 {
        let config = WindowConfig::with_period(Duration::from_millis(1)).window_id("racing");
        let (emitter, receiver) = ChannelEmitter::channel();
        let runtime = WindowRuntime::start(&config, emitter).unwrap();
        let shared = &runtime;

        let accepted: usize = thread::scope(|scope| {
            let senders: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(move || {
                        let mut accepted = 0;
                        for _ in 0..500 {
                            match shared.on_event(Some("IBM".to_string()), Some(2), Vec::new()) {
                                Some(_) => accepted += 1,
                                None => break,
                            }
                        }
                        accepted
                    })
                })
                .collect();
            thread::sleep(Duration::from_millis(2));
            runtime.shutdown();
            senders.into_iter().map(|h| h.join().unwrap()).sum()
        });

        let snapshots: Vec<Snapshot<String>> = receiver.try_iter().collect();
        let arrivals = snapshots
            .iter()
            .filter(|s| s.cause == SnapshotCause::Arrival)
            .count();
        assert_eq!(arrivals, accepted);
        assert_eq!(runtime.active_tasks(), 0);
        thread::sleep(Duration::from_millis(5));
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }
}
