use super::*;
use crate::clock::FrameClock;

const DT: f64 = 0.016;

fn walker(speed: f64) -> Walker {
    Walker::new(
        0.3,
        speed,
        0.2,
        GaitParams {
            step_rate: 1.6,
            ..GaitParams::default()
        },
        (-0.2, 1.2),
        [-0.02, 0.02, -0.02, 0.02],
    )
}

fn assert_feet_under_body(w: &Walker, when: &str) {
    let stride = w.stride().abs();
    for leg in 0..LEG_COUNT {
        let state = w.legs[leg];
        let hip = w.hip(leg);
        assert!((state.contact - hip).abs() <= stride + 1e-9, "leg {leg} {when}: contact");
        assert!((state.next_contact - hip).abs() <= stride + 1e-9, "leg {leg} {when}: next");
        assert!((w.pose(leg).foot_x - hip).abs() <= stride + 1e-9, "leg {leg} {when}: foot");
    }
}

#[test]
fn speed_is_independent_of_frame_count() {
    let mut w = walker(0.02);
    let start = w.x;
    let steps = 312;
    for i in 1..=steps {
        w.advance(DT);
    }
    let moved = w.x - start;
    assert!((moved - 0.02 * f64::from(steps) * DT).abs() < 1e-9);
    assert!((moved - 0.1).abs() <= 0.02 * DT + 1e-9, "{moved}");

    // Same span simulated at a different refresh rate ends at the same place.
    let mut coarse = walker(0.02);
    let dt = 0.032;
    for _ in 1..=156 {
        coarse.advance(dt);
    }
    assert!((coarse.x - w.x).abs() < 1e-9);
}

#[test]
fn contacts_change_only_on_landing_and_match_plan() {
    let mut w = walker(0.05);
    let mut prev = w.legs;
    let mut landings = 0;
    for i in 1..2000 {
        let shift = w.advance(DT);
        for leg in 0..LEG_COUNT {
            let before = prev[leg];
            let after = w.legs[leg];
            let expected_contact = match (before.stance, after.stance) {
                (false, true) => {
                    landings += 1;
                    before.next_contact + shift
                }
                _ => before.contact + shift,
            };
            assert_eq!(after.contact, expected_contact, "leg {leg} frame {i}");
            if before.stance && !after.stance {
                assert!((after.next_contact - after.contact - w.stride()).abs() < 1e-12);
            }
        }
        prev = w.legs;
    }
    assert!(landings > 10);
}

#[test]
fn wrap_keeps_bounds_and_feet_attached() {
    let mut w = walker(0.4);
    let mut prev_rel: Option<[f64; LEG_COUNT]> = None;
    let mut wraps = 0;
    for i in 1..3000 {
        if w.advance(DT) != 0.0 {
            wraps += 1;
        }
        assert!(w.x >= -0.2 && w.x < 1.2, "{}", w.x);
        let rel: [f64; LEG_COUNT] = std::array::from_fn(|leg| w.pose(leg).foot_x - w.hip(leg));
        if let Some(prev) = prev_rel {
            for leg in 0..LEG_COUNT {
                assert!((rel[leg] - prev[leg]).abs() <= w.stride().abs(), "leg {leg} frame {i}");
            }
        }
        prev_rel = Some(rel);
    }
    assert!(wraps >= 2);
}

#[test]
fn primed_feet_straddle_hips() {
    let w = walker(0.05);
    for leg in 0..LEG_COUNT {
        let rel = w.pose(leg).foot_x - w.hip(leg);
        assert!(rel.abs() <= w.stride().abs(), "leg {leg}: {rel}");
    }
}

#[test]
fn swing_lift_is_half_sine() {
    let mut w = walker(0.05);
    for _ in 0..200 {
        w.advance(0.01);
        for leg in 0..LEG_COUNT {
            let pose = w.pose(leg);
            assert!((0.0..=1.0).contains(&pose.lift));
            if w.legs[leg].stance {
                assert_eq!(pose.lift, 0.0);
            }
        }
    }
}

#[test]
fn left_walker_moves_left() {
    let mut w = walker(-0.03);
    let start = w.x;
    for _ in 1..=10 {
        w.advance(DT);
    }
    assert!(w.x < start);
    assert!(w.stride() < 0.0);
}

#[test]
fn slow_hosts_keep_feet_under_the_body() {
    // 20 fps host: every delta is clamped, so the gait must follow the clamped time too.
    let mut clock = FrameClock::default();
    let mut w = walker(0.02);
    for i in 0..1200 {
        let time = clock.tick(f64::from(i) * 50.0);
        w.advance(time.delta_secs);
        assert_feet_under_body(&w, &format!("frame {i}"));
    }
    assert!((w.gait_time - 1199.0 * clock.opts().max_delta_secs).abs() < 1e-6);
}

#[test]
fn one_long_delta_walks_every_step() {
    let mut long = walker(0.05);
    let mut short = walker(0.05);
    long.advance(7.5);
    for _ in 0..750 {
        short.advance(0.01);
    }
    assert_feet_under_body(&long, "after one long delta");
    assert!((long.x - short.x).abs() < 1e-9);
    for leg in 0..LEG_COUNT {
        assert_eq!(long.legs[leg].stance, short.legs[leg].stance, "leg {leg}");
        assert!((long.legs[leg].contact - short.legs[leg].contact).abs() < 1e-9, "leg {leg}");
    }
}

#[test]
fn degenerate_deltas_leave_the_walker_alone() {
    let mut w = walker(0.05);
    let before = w.clone();
    for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert_eq!(w.advance(dt), 0.0);
    }
    assert_eq!(w, before);
}

#[test]
fn knee_respects_segment_lengths() {
    let hip = Point::new(0.0, 0.0);
    let foot = Point::new(3.0, 6.0);
    let knee = leg_joints(hip, foot, 4.0, 4.0, 1.0);
    assert!(((knee - hip).hypot() - 4.0).abs() < 1e-9);
    assert!(((foot - knee).hypot() - 4.0).abs() < 1e-9);
    let other = leg_joints(hip, foot, 4.0, 4.0, -1.0);
    assert!((knee - other).hypot() > 1.0);

    let far = leg_joints(hip, Point::new(0.0, 100.0), 4.0, 4.0, 1.0);
    assert!(far.y > 3.9);
}
