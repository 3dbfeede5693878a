use super::*;
use crate::foundation::core::Point;
use crate::surface::draw::rect_path;

fn square() -> BezPath {
    rect_path(Rect::new(0.0, 0.0, 4.0, 4.0))
}

#[test]
fn fills_capture_alpha_and_composite() {
    let mut s = RecordingSurface::new(SurfaceSize::new(10, 10));
    let log = s.log();
    s.save();
    s.set_global_alpha(0.25);
    s.set_composite(CompositeOp::Lighter);
    s.fill_path(&square(), &Paint::solid(Rgba::WHITE));
    s.restore();
    s.fill_path(&square(), &Paint::solid(Rgba::WHITE));

    let fills: Vec<_> = log
        .ops()
        .into_iter()
        .filter(|op| matches!(op, DrawOp::Fill { .. }))
        .collect();
    assert_eq!(fills.len(), 2);
    match (&fills[0], &fills[1]) {
        (
            DrawOp::Fill {
                alpha: a0,
                composite: c0,
                ..
            },
            DrawOp::Fill {
                alpha: a1,
                composite: c1,
                ..
            },
        ) => {
            assert_eq!((*a0, *c0), (0.25, CompositeOp::Lighter));
            assert_eq!((*a1, *c1), (1.0, CompositeOp::SourceOver));
        }
        _ => unreachable!(),
    }
}

#[test]
fn unsupported_features_are_ignored() {
    let mut s = RecordingSurface::with_capabilities(SurfaceSize::new(8, 8), Capabilities::BASIC);
    let log = s.log();
    assert!(!s.supports(Capability::Clip));
    s.clip(&square());
    s.set_composite(CompositeOp::DestinationOut);
    assert!(s.create_pattern(&PatternTile::from_fn(1, 1, |_, _| [0; 4])).is_none());
    s.fill_path(&square(), &Paint::solid(Rgba::BLACK));

    let ops = log.take();
    assert_eq!(ops.len(), 1);
    assert!(matches!(
        ops[0],
        DrawOp::Fill {
            composite: CompositeOp::SourceOver,
            ..
        }
    ));
    assert!(log.is_empty());
}

#[test]
fn unbalanced_restore_is_ignored() {
    let mut s = RecordingSurface::new(SurfaceSize::new(8, 8));
    s.restore();
    assert_eq!(s.save_depth(), 0);
    assert!(s.log().is_empty());
}

#[test]
fn ops_serialize_to_json() {
    let mut s = RecordingSurface::new(SurfaceSize::new(8, 8));
    s.fill_path(
        &rect_path(Rect::new(0.0, 0.0, 2.0, 2.0)),
        &Paint::radial(Point::new(1.0, 1.0), 0.0, 2.0, &[(0.0, Rgba::WHITE), (1.0, Rgba::TRANSPARENT)]),
    );
    let json = serde_json::to_value(s.log().ops()).unwrap();
    assert_eq!(json[0]["op"], "fill");
    assert_eq!(json[0]["paint"]["kind"], "radial");
}

#[test]
fn capabilities_without_clears_one_flag() {
    let caps = Capabilities::ALL.without(Capability::Patterns);
    assert!(!caps.has(Capability::Patterns));
    assert!(caps.has(Capability::Clip));
}
