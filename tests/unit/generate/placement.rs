use super::*;

fn row() -> RowSpec {
    RowSpec {
        start: -0.05,
        end: 1.06,
        width_min: 0.026,
        width_max: 0.09,
        gap_min: 0.003,
        gap_max: 0.015,
        max_items: 128,
    }
}

#[test]
fn packed_row_never_overlaps() {
    let items = pack_row(&mut Lcg::new(19), row(), |_, x, w| (x, w));
    assert!(items.len() > 5);
    for pair in items.windows(2) {
        let (x0, w0) = pair[0];
        let (x1, _) = pair[1];
        assert!(x0 + w0 < x1, "{pair:?}");
    }
    let (last_x, _) = items[items.len() - 1];
    assert!(last_x < 1.06);
}

#[test]
fn packed_row_is_deterministic_and_respects_cap() {
    let a = pack_row(&mut Lcg::new(19), row(), |r, x, w| (x, w, r.index(3)));
    let b = pack_row(&mut Lcg::new(19), row(), |r, x, w| (x, w, r.index(3)));
    assert_eq!(a, b);

    let capped = pack_row(
        &mut Lcg::new(19),
        RowSpec {
            max_items: 3,
            ..row()
        },
        |_, x, _| x,
    );
    assert_eq!(capped.len(), 3);
}

#[test]
fn scatter_keeps_spacing_when_feasible() {
    let xs = scatter_spaced(&mut Lcg::new(53), 10, 0.0, 1.0, 0.05, 64);
    assert_eq!(xs.len(), 10);
    for (i, a) in xs.iter().enumerate() {
        for b in &xs[i + 1..] {
            assert!((a - b).abs() >= 0.05, "{a} vs {b}");
        }
    }
}

#[test]
fn scatter_degrades_instead_of_hanging() {
    // 50 points 0.5 apart in a unit interval is impossible; it must still return promptly.
    let xs = scatter_spaced(&mut Lcg::new(1), 50, 0.0, 1.0, 0.5, 8);
    assert_eq!(xs.len(), 50);
    assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
}

#[test]
fn ridge_valley_is_lower_than_flanks_on_average() {
    let spec = RidgeSpec {
        stations: 41,
        base: 0.6,
        amplitude: 0.2,
        valley_center: 0.5,
        valley_width: 0.12,
        valley_depth: 0.9,
    };
    let ridge = ridge_profile(&mut Lcg::new(77), spec);
    assert_eq!(ridge.len(), 41);
    assert_eq!(ridge[0].x, 0.0);
    assert_eq!(ridge[40].x, 1.0);
    // Smaller y is higher on screen; the valley station should sit near the baseline.
    let center = ridge[20].y;
    assert!(center > spec.base - spec.amplitude * 0.15);
    for s in &ridge {
        assert!(s.y <= spec.base + 1e-12);
        assert!(s.y >= spec.base - spec.amplitude);
    }
    assert_eq!(ridge, ridge_profile(&mut Lcg::new(77), spec));
}
