use pagestrip::page::Size;
use pagestrip::view::{
    FitMode, Offset, Point, RotateDirection, Rotation, ViewAction, ViewState, ZoomLimits,
    focal_zoom_offset,
};

const ROTATIONS: [Rotation; 4] = [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];
const FIT_MODES: [FitMode; 5] = [
    FitMode::FitWidth,
    FitMode::FitHeight,
    FitMode::FitContain,
    FitMode::Original,
    FitMode::Fill,
];

#[test]
fn fit_mode_change_resets_zoom_exactly() {
    let limits = ZoomLimits::default();
    for from in FIT_MODES {
        for to in FIT_MODES {
            let state = ViewState::with_fit(from).reduce(ViewAction::SetZoom(3.337), &limits);
            let next = state.reduce(ViewAction::SetFitMode(to), &limits);
            if from == to {
                assert_eq!(next, state);
            } else {
                assert_eq!(next.zoom, 1.0);
                assert_eq!(next.fit_mode, to);
            }
        }
    }
}

#[test]
fn rotations_cancel_and_cycle() {
    let limits = ZoomLimits::default();
    for rotation in ROTATIONS {
        let start = ViewState {
            rotation,
            ..ViewState::default()
        };
        let back = start
            .reduce(ViewAction::Rotate(RotateDirection::Clockwise), &limits)
            .reduce(ViewAction::Rotate(RotateDirection::CounterClockwise), &limits);
        assert_eq!(back, start);

        for direction in [RotateDirection::Clockwise, RotateDirection::CounterClockwise] {
            let cycled = (0..4).fold(start, |s, _| s.reduce(ViewAction::Rotate(direction), &limits));
            assert_eq!(cycled, start);
        }
    }
}

#[test]
fn zoom_clamps_to_configured_bounds() {
    let limits = ZoomLimits::sanitized(0.25, 5.0, 0.2);
    let state = ViewState::default();
    assert_eq!(state.reduce(ViewAction::SetZoom(limits.min_zoom - 1.0), &limits).zoom, 0.25);
    assert_eq!(state.reduce(ViewAction::SetZoom(limits.max_zoom + 1.0), &limits).zoom, 5.0);
    assert_eq!(state.reduce(ViewAction::ZoomBy(100.0), &limits).zoom, 5.0);
}

#[test]
fn tiny_zoom_changes_are_ignored() {
    let limits = ZoomLimits::default();
    let state = ViewState::default();
    assert_eq!(state.reduce(ViewAction::SetZoom(1.00004), &limits), state);
    assert_eq!(state.reduce(ViewAction::SetZoom(1.0004), &limits).zoom, 1.0);
    assert_eq!(state.reduce(ViewAction::SetZoom(1.2346), &limits).zoom, 1.235);
}

#[test]
fn center_focal_zoom_keeps_offset_unrotated() {
    let viewport = Size::new(800.0, 600.0);
    let offset = focal_zoom_offset(
        Point::new(400.0, 300.0),
        viewport,
        Offset::ZERO,
        1.0,
        2.5,
        Rotation::Deg0,
    );
    assert!(offset.approx_eq(&Offset::ZERO, 1e-5));
}

#[test]
fn zoom_in_then_out_restores_offset_at_any_rotation() {
    let viewport = Size::new(1024.0, 768.0);
    let start = Offset::new(-37.5, 12.25);
    let pointers = [Point::new(100.0, 80.0), Point::new(900.0, 700.0), Point::new(512.0, 10.0)];

    for rotation in ROTATIONS {
        for pointer in pointers {
            let zoomed = focal_zoom_offset(pointer, viewport, start, 1.3, 1.3 * 1.1, rotation);
            let restored = focal_zoom_offset(pointer, viewport, zoomed, 1.3 * 1.1, 1.3, rotation);
            assert!(
                restored.approx_eq(&start, 1e-3),
                "{rotation:?} at {pointer:?}: {restored:?} != {start:?}"
            );
        }
    }
}

#[test]
fn focal_point_stays_under_pointer() {
    // The content point under the pointer before zoom is still there after,
    // measured in content coordinates relative to the content center.
    let viewport = Size::new(640.0, 480.0);
    let pointer = Point::new(500.0, 100.0);
    let offset = Offset::new(20.0, -10.0);
    let (old_scale, new_scale) = (2.0, 3.0);

    let new_offset = focal_zoom_offset(pointer, viewport, offset, old_scale, new_scale, Rotation::Deg0);
    let content_before = (pointer.x - (320.0 + offset.x)) / old_scale;
    let content_after = (pointer.x - (320.0 + new_offset.x)) / new_scale;
    assert!((content_before - content_after).abs() < 1e-4);
}

#[test]
fn wheel_steps_and_stops_at_bounds() {
    let limits = ZoomLimits::default();
    let mut state = ViewState::default();
    let mut ticks = 0;
    while let Some(next) = state.wheel_zoom(-120.0, &limits) {
        assert!(next.zoom > state.zoom);
        state = next;
        ticks += 1;
        assert!(ticks < 100);
    }
    assert_eq!(state.zoom, limits.max_zoom);
    assert!(state.wheel_zoom(120.0, &limits).is_some());
}

#[test]
fn wheel_leaves_configured_minimum() {
    let limits = ZoomLimits::sanitized(0.002, 8.0, 0.1);
    let at_min = ViewState::default().reduce(ViewAction::SetZoom(0.0), &limits);
    assert_eq!(at_min.zoom, limits.min_zoom);

    let zoomed = at_min.wheel_zoom(-1.0, &limits).unwrap();
    assert!(zoomed.zoom > at_min.zoom);
    assert!(at_min.wheel_zoom(1.0, &limits).is_none());
}
