use super::*;

#[test]
fn progress_clamps_and_handles_zero_duration() {
    assert_eq!(progress(0.5, 1.0), 0.5);
    assert_eq!(progress(-1.0, 1.0), 0.0);
    assert_eq!(progress(3.0, 1.0), 1.0);
    assert_eq!(progress(0.0, 0.0), 1.0);
    assert_eq!(progress(0.0, f64::NAN), 1.0);
}

#[test]
fn crossfade_gains_sum_to_one() {
    assert_eq!(crossfade_gains(0.0), (1.0, 0.0));
    assert_eq!(crossfade_gains(1.0), (0.0, 1.0));
    for i in 0..=10 {
        let (o, n) = crossfade_gains(f64::from(i) / 10.0);
        assert!((o + n - 1.0).abs() < 1e-12);
    }
}

#[test]
fn cover_fit_fills_canvas_and_centres_overflow() {
    // 16:9 source onto a 9:16 canvas: scaled by height, cropped horizontally.
    let tr = cover_fit(1920, 1080, 720, 1280);
    let r = tr.transform_rect_bbox(Rect::new(0.0, 0.0, 1920.0, 1080.0));
    assert!((r.height() - 1280.0).abs() < 1e-9);
    assert!(r.width() >= 720.0);
    assert!((r.x0 + r.x1 - 720.0).abs() < 1e-9, "centred: {r:?}");
    assert!(r.y0.abs() < 1e-9);

    let same = cover_fit(640, 360, 1280, 720);
    let r = same.transform_rect_bbox(Rect::new(0.0, 0.0, 640.0, 360.0));
    assert!((r.width() - 1280.0).abs() < 1e-9 && (r.height() - 720.0).abs() < 1e-9);
}

#[test]
fn wipe_left_and_right_mirror_each_other() {
    let (w, h) = (1280, 720);
    for i in 0..=8 {
        let t = f64::from(i) / 8.0;
        let l = wipe_reveal_rect(TransitionKind::WipeLeft, t, w, h).unwrap();
        let r = wipe_reveal_rect(TransitionKind::WipeRight, t, w, h).unwrap();
        assert!((l.x0 - (1280.0 - r.x1)).abs() < 1e-9);
        assert!((l.x1 - (1280.0 - r.x0)).abs() < 1e-9);
        assert!((l.width() - 1280.0 * t).abs() < 1e-9);
        assert_eq!((l.y0, l.y1), (0.0, 720.0));
    }
    assert!(wipe_reveal_rect(TransitionKind::Fade, 0.5, w, h).is_none());
}

#[test]
fn fade_ramps_incoming_opacity() {
    let l = transition_layers(TransitionKind::Fade, 0.25, 100, 100);
    assert_eq!(l.outgoing, LayerPlacement::FULL);
    assert_eq!(l.incoming.opacity, 0.25);
    assert!(l.incoming.reveal.is_none());
}

#[test]
fn slides_move_both_layers_in_opposite_directions() {
    let l = transition_layers(TransitionKind::SlideLeft, 0.5, 200, 100);
    assert_eq!(l.outgoing.offset_x, -100.0);
    assert_eq!(l.incoming.offset_x, 100.0);

    let r = transition_layers(TransitionKind::SlideRight, 0.5, 200, 100);
    assert_eq!(r.outgoing.offset_x, 100.0);
    assert_eq!(r.incoming.offset_x, -100.0);

    let done = transition_layers(TransitionKind::SlideLeft, 1.0, 200, 100);
    assert_eq!(done.incoming.offset_x, 0.0);
}

#[test]
fn hard_cut_shows_only_one_layer() {
    let before = transition_layers(TransitionKind::None, 0.99, 10, 10);
    assert!(before.outgoing.is_visible() && !before.incoming.is_visible());
    let after = transition_layers(TransitionKind::None, 1.0, 10, 10);
    assert!(!after.outgoing.is_visible() && after.incoming.is_visible());
}

#[test]
fn empty_wipe_reveal_is_invisible() {
    let start = transition_layers(TransitionKind::WipeRight, 0.0, 10, 10);
    assert!(!start.incoming.is_visible());
    assert!(start.outgoing.is_visible());
}
