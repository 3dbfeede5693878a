use super::*;

fn driver() -> (Driver, ManualScheduler) {
    let sched = ManualScheduler::new();
    (Driver::new(Box::new(sched.clone())), sched)
}

#[test]
fn each_tick_reschedules_exactly_once() {
    let (mut d, sched) = driver();
    d.start();
    d.start();
    assert_eq!(sched.pending_count(), 1);

    let mut runs = 0;
    for _ in 0..5 {
        let req = sched.take_pending().unwrap();
        assert_eq!(d.on_frame(req, || runs += 1), TickOutcome::Continued);
        assert_eq!(sched.pending_count(), 1);
    }
    assert_eq!(runs, 5);
    assert_eq!(d.ticks(), 5);
}

#[test]
fn stop_withdraws_pending_request() {
    let (mut d, sched) = driver();
    d.start();
    d.stop();
    assert_eq!(sched.pending_count(), 0);
    assert_eq!(sched.cancelled_count(), 1);
    assert!(d.pending().is_none());

    d.stop();
    d.start();
    assert_eq!(sched.pending_count(), 0);
}

#[test]
fn cancel_during_work_makes_it_the_last_tick() {
    let (mut d, sched) = driver();
    let token = d.token();
    d.start();

    let req = sched.take_pending().unwrap();
    let outcome = d.on_frame(req, || token.cancel());
    assert_eq!(outcome, TickOutcome::Stopped);
    assert_eq!(sched.pending_count(), 0);
    assert_eq!(d.ticks(), 1);
}

#[test]
fn stale_callback_after_stop_never_runs_work() {
    let (mut d, sched) = driver();
    d.start();
    let req = sched.take_pending().unwrap();
    // The host fired the callback but it is delivered only after teardown.
    d.stop();
    let mut ran = false;
    assert_eq!(d.on_frame(req, || ran = true), TickOutcome::Ignored);
    assert!(!ran);
}

#[test]
fn cancelled_token_stops_pending_tick_without_work() {
    let (mut d, sched) = driver();
    d.start();
    let req = sched.take_pending().unwrap();
    d.token().cancel();
    let mut ran = false;
    assert_eq!(d.on_frame(req, || ran = true), TickOutcome::Stopped);
    assert!(!ran);
    assert_eq!(sched.pending_count(), 0);
}

#[test]
fn unknown_request_is_ignored() {
    let (mut d, _sched) = driver();
    d.start();
    assert_eq!(d.on_frame(FrameRequest(999), || {}), TickOutcome::Ignored);
    assert!(d.pending().is_some());
}
