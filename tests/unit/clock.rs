use super::*;

#[test]
fn first_frame_has_zero_delta() {
    let mut c = FrameClock::default();
    let t = c.tick(1_000.0);
    assert_eq!(t.elapsed_secs, 1.0);
    assert_eq!(t.delta_secs, 0.0);
    assert_eq!(t.frame, 0);
}

#[test]
fn delta_follows_timestamps() {
    let mut c = FrameClock::default();
    c.tick(0.0);
    let t = c.tick(16.0);
    assert!((t.delta_secs - 0.016).abs() < 1e-12);
    assert_eq!(t.frame, 1);
}

#[test]
fn delta_never_exceeds_clamp() {
    let opts = ClockOpts::default();
    let mut c = FrameClock::new(opts);
    let gaps = [0.0, 5.0, 16.7, 33.0, 34.0, 250.0, 60_000.0, 3_600_000.0, 1e12];
    let mut ts = 0.0;
    for gap in gaps {
        ts += gap;
        let t = c.tick(ts);
        assert!(t.delta_secs <= opts.max_delta_secs, "gap {gap}: {t:?}");
        assert!(t.delta_secs >= 0.0);
    }
}

#[test]
fn huge_gap_keeps_raw_elapsed() {
    let mut c = FrameClock::default();
    c.tick(0.0);
    let t = c.tick(120_000.0);
    assert_eq!(t.elapsed_secs, 120.0);
    assert!((t.delta_secs - 0.033).abs() < 1e-12);
}

#[test]
fn backwards_and_nan_timestamps_are_ignored() {
    let mut c = FrameClock::default();
    c.tick(500.0);
    let back = c.tick(400.0);
    assert_eq!(back.delta_secs, 0.0);
    assert_eq!(back.elapsed_secs, 0.5);
    let nan = c.tick(f64::NAN);
    assert_eq!(nan.delta_secs, 0.0);
    assert_eq!(nan.elapsed_secs, 0.5);
    let next = c.tick(510.0);
    assert!((next.delta_secs - 0.01).abs() < 1e-12);
}

#[test]
fn prime_resets_delta() {
    let mut c = FrameClock::default();
    c.tick(0.0);
    c.tick(16.0);
    c.prime();
    let t = c.tick(10_000.0);
    assert_eq!(t.delta_secs, 0.0);
    assert_eq!(t.frame, 0);
}
