//! Cancellation conformance tests.
//!
//! Each test drives a computation by hand with its own controller so the
//! exact point at which cancellation is requested is under test control.

mod common;

use common::{init_test_logging, parked, EventLog, Recorder};
use effectum::combinator::{
    acquire_use_release, from_callback, is_interruptible, succeed, sync, uninterruptible_mask,
    unit,
};
use effectum::{CancelKind, CancelReason, CancelSignal, Computation, Never, Outcome};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_release(
    log: &EventLog,
) -> impl Fn(u32, &Outcome<u32, Never>) -> Computation<(), Never> + Send + Sync + 'static {
    let log = log.clone();
    move |resource, outcome| {
        let log = log.clone();
        let line = format!("release {resource} after {}", describe(outcome));
        sync(move || log.push(line.clone()))
    }
}

fn describe(outcome: &Outcome<u32, Never>) -> &'static str {
    match outcome {
        Outcome::Ok(_) => "ok",
        Outcome::Err(_) => "err",
        Outcome::Cancelled(_) => "cancelled",
        Outcome::Defect(_) => "defect",
    }
}

#[test]
fn cancelling_a_suspended_use_releases_once() {
    init_test_logging();
    let log = EventLog::default();
    let (body, slot) = parked::<u32>();
    let comp = acquire_use_release(succeed(9_u32), move |_| body.clone(), counting_release(&log));

    let controller = CancelSignal::new();
    let recorder = Recorder::new();
    recorder.run(&comp, &controller);
    assert_eq!(recorder.count(), 0, "use is suspended");

    controller.request(CancelReason::user("abort request"));
    assert_eq!(
        recorder.last(),
        Some(Outcome::Cancelled(CancelReason::user("abort request")))
    );
    assert_eq!(log.snapshot(), vec!["release 9 after cancelled"]);

    let resume = slot.lock().take().expect("use registered");
    assert!(!resume.succeed(1), "late resume is ignored");
    assert_eq!(recorder.count(), 1);
    assert_eq!(log.snapshot().len(), 1);
}

#[test]
fn uninterruptible_body_ignores_requests_until_done() {
    init_test_logging();
    let log = EventLog::default();
    let controller = CancelSignal::new();
    let trigger = controller.clone();
    let (first, second, after) = (log.clone(), log.clone(), log.clone());

    let masked: Computation<(), Never> = sync(move || {
        first.push("step 1");
        trigger.request(CancelReason::user("mid mask"));
    })
    .zip_right(sync(move || second.push("step 2")))
    .uninterruptible();
    let comp = masked.zip_right(sync(move || after.push("after mask")));

    let recorder = Recorder::new();
    recorder.run(&comp, &controller);
    assert_eq!(log.snapshot(), vec!["step 1", "step 2"]);
    assert_eq!(
        recorder.last(),
        Some(Outcome::Cancelled(CancelReason::user("mid mask")))
    );
}

#[test]
fn suspended_masked_callback_is_not_cancelled() {
    init_test_logging();
    let (body, slot) = parked::<u8>();
    let comp = body.uninterruptible();
    let controller = CancelSignal::new();
    let recorder = Recorder::new();
    recorder.run(&comp, &controller);

    controller.request(CancelReason::shutdown());
    assert_eq!(recorder.count(), 0, "masked callback does not observe the request");

    let resume = slot.lock().take().expect("registered");
    assert!(resume.succeed(4));
    assert_eq!(recorder.last(), Some(Outcome::Ok(4)));
}

#[test]
fn restore_reopens_interruption_only_from_interruptible_callers() {
    init_test_logging();
    let outer_check: Computation<bool, Never> =
        uninterruptible_mask(|restore| restore.apply(is_interruptible()));
    let nested_check: Computation<bool, Never> = outer_check.clone().uninterruptible();

    let outer = Recorder::new();
    outer.run(&outer_check, &CancelSignal::new());
    assert_eq!(outer.last(), Some(Outcome::Ok(true)));

    let nested = Recorder::new();
    nested.run(&nested_check, &CancelSignal::new());
    assert_eq!(nested.last(), Some(Outcome::Ok(false)));
}

#[test]
fn cancellation_cleanup_runs_before_outcome() {
    init_test_logging();
    let log = EventLog::default();
    let cleanup_log = log.clone();
    let comp: Computation<u8, Never> = from_callback(move |_resume, _signal| {
        let cleanup_log = cleanup_log.clone();
        Some(sync(move || cleanup_log.push("cleanup")))
    });
    let observed = log.clone();
    let comp = comp.on_cancel(sync(move || observed.push("on_cancel")));

    let controller = CancelSignal::new();
    let recorder = Recorder::new();
    recorder.run(&comp, &controller);
    controller.request(CancelReason::user("stop"));

    assert!(recorder.last().is_some_and(|o| o.is_cancelled()));
    assert_eq!(log.snapshot(), vec!["cleanup", "on_cancel"]);
    assert_eq!(controller.listener_count(), 0);
}

#[test]
fn aborting_a_child_waits_for_its_finalizers() {
    init_test_logging();
    let log = EventLog::default();
    let (body, _slot) = parked::<u32>();
    let child = acquire_use_release(succeed(3_u32), move |_| body.clone(), counting_release(&log));

    let view = log.clone();
    let comp: Computation<(Outcome<u32, Never>, Vec<String>), Never> = child
        .fork()
        .flat_map(|handle| handle.abort())
        .map(move |outcome| (outcome, view.snapshot()));

    let recorder = Recorder::new();
    recorder.run(&comp, &CancelSignal::new());
    match recorder.last() {
        Some(Outcome::Ok((Outcome::Cancelled(reason), seen))) => {
            assert_eq!(reason.kind, CancelKind::Aborted);
            assert_eq!(seen, vec!["release 3 after cancelled"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parent_cancellation_reaches_linked_children_only() {
    init_test_logging();
    let (linked_body, _a) = parked::<u8>();
    let (daemon_body, _b) = parked::<u8>();
    let controller = CancelSignal::new();
    let handles = Arc::new(parking_lot::Mutex::new(None));
    let keep = Arc::clone(&handles);

    let comp: Computation<(), Never> = linked_body.fork().flat_map(move |linked| {
        let keep = Arc::clone(&keep);
        daemon_body.clone().fork_daemon().map(move |daemon| {
            *keep.lock() = Some((linked.clone(), daemon));
        })
    });
    let recorder = Recorder::new();
    recorder.run(&comp, &controller);
    assert_eq!(recorder.last(), Some(Outcome::Ok(())));

    controller.request(CancelReason::user("parent gone"));
    let (linked, daemon) = handles.lock().take().expect("forked");
    match linked.try_outcome() {
        Some(Outcome::Cancelled(reason)) => assert_eq!(reason.kind, CancelKind::ParentCancelled),
        other => panic!("linked child should be cancelled, got {other:?}"),
    }
    assert!(!daemon.is_done(), "daemon is not linked");
    assert!(daemon.cancel(CancelReason::shutdown()));
    assert!(daemon.is_done());
}

proptest! {
    #![proptest_config(common::test_proptest_config(64))]

    /// However many times and in whatever order a callback is resumed, the
    /// continuation sees only the first resumption.
    #[test]
    fn only_the_first_resume_counts(values in prop::collection::vec(any::<u16>(), 1..16)) {
        init_test_logging();
        let (comp, slot) = parked::<u16>();
        let recorder = Recorder::new();
        recorder.run(&comp, &CancelSignal::new());

        let resume = slot.lock().take().expect("registered");
        let accepted: Vec<bool> = values.iter().map(|v| resume.succeed(*v)).collect();

        prop_assert_eq!(recorder.count(), 1);
        prop_assert_eq!(recorder.last(), Some(Outcome::Ok(values[0])));
        prop_assert!(accepted[0]);
        prop_assert!(accepted[1..].iter().all(|a| !a));
    }

    /// Releases happen exactly once for every successful acquire, whether
    /// `use` completes or is cancelled.
    #[test]
    fn release_runs_once_per_acquire(cancel in any::<bool>(), value in any::<u32>()) {
        init_test_logging();
        let releases = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&releases);
        let (body, slot) = parked::<u32>();
        let comp = acquire_use_release(
            succeed(value),
            move |_| body.clone(),
            move |_, _| {
                counted.fetch_add(1, Ordering::SeqCst);
                unit()
            },
        );
        let controller = CancelSignal::new();
        let recorder = Recorder::new();
        recorder.run(&comp, &controller);

        if cancel {
            controller.request(CancelReason::user("prop"));
        }
        if let Some(resume) = slot.lock().take() {
            resume.succeed(value);
        }
        prop_assert_eq!(releases.load(Ordering::SeqCst), 1);
        prop_assert_eq!(recorder.count(), 1);
        prop_assert_eq!(recorder.last().is_some_and(|o| o.is_cancelled()), cancel);
    }
}
