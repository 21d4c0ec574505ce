use super::*;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn compositor() -> Compositor {
    Compositor::new(
        Canvas {
            width: 64,
            height: 36,
        },
        None,
    )
    .unwrap()
}

fn close(px: [u8; 4], want: [u8; 4]) -> bool {
    px.iter().zip(want).all(|(a, b)| a.abs_diff(b) <= 3)
}

#[test]
fn solo_frame_covers_the_canvas() {
    let mut c = compositor();
    let red = VideoFrame::solid(32, 18, RED);
    let out = c.render_solo(Some(&red), None).unwrap();
    assert_eq!((out.width, out.height), (64, 36));
    assert!(out.premultiplied);
    for (x, y) in [(2, 2), (32, 18), (61, 33)] {
        assert!(close(out.pixel(x, y).unwrap(), RED), "pixel {x},{y}");
    }
}

#[test]
fn mismatched_aspect_is_cropped_not_letterboxed() {
    let mut c = compositor();
    // Portrait source on a landscape canvas.
    let red = VideoFrame::solid(18, 32, RED);
    let out = c.render_solo(Some(&red), None).unwrap();
    assert!(close(out.pixel(1, 18).unwrap(), RED));
    assert!(close(out.pixel(62, 18).unwrap(), RED));
    assert!(close(out.pixel(32, 1).unwrap(), RED));
}

#[test]
fn missing_frame_renders_black() {
    let mut c = compositor();
    let out = c.render_solo(None, None).unwrap();
    assert_eq!(out.pixel(10, 10), Some([0, 0, 0, 255]));
}

#[test]
fn wipe_left_reveals_incoming_from_the_right() {
    let mut c = compositor();
    let red = VideoFrame::solid(64, 36, RED);
    let blue = VideoFrame::solid(64, 36, BLUE);
    let out = c
        .render_transition(Some(&red), Some(&blue), TransitionKind::WipeLeft, 0.5, None)
        .unwrap();
    assert!(close(out.pixel(8, 18).unwrap(), RED));
    assert!(close(out.pixel(56, 18).unwrap(), BLUE));

    let out = c
        .render_transition(Some(&red), Some(&blue), TransitionKind::WipeRight, 0.5, None)
        .unwrap();
    assert!(close(out.pixel(8, 18).unwrap(), BLUE));
    assert!(close(out.pixel(56, 18).unwrap(), RED));
}

#[test]
fn fade_blends_both_layers() {
    let mut c = compositor();
    let red = VideoFrame::solid(64, 36, RED);
    let blue = VideoFrame::solid(64, 36, BLUE);
    let out = c
        .render_transition(Some(&red), Some(&blue), TransitionKind::Fade, 0.5, None)
        .unwrap();
    let px = out.pixel(32, 18).unwrap();
    assert!(close(px, [128, 0, 128, 255]), "{px:?}");

    let end = c
        .render_transition(Some(&red), Some(&blue), TransitionKind::Fade, 1.0, None)
        .unwrap();
    assert!(close(end.pixel(32, 18).unwrap(), BLUE));
}

#[test]
fn slide_left_pushes_outgoing_off_screen() {
    let mut c = compositor();
    let red = VideoFrame::solid(64, 36, RED);
    let blue = VideoFrame::solid(64, 36, BLUE);
    let out = c
        .render_transition(Some(&red), Some(&blue), TransitionKind::SlideLeft, 0.25, None)
        .unwrap();
    assert!(close(out.pixel(20, 18).unwrap(), RED));
    assert!(close(out.pixel(60, 18).unwrap(), BLUE));
}

#[test]
fn hard_cut_never_blends() {
    let mut c = compositor();
    let red = VideoFrame::solid(64, 36, RED);
    let blue = VideoFrame::solid(64, 36, BLUE);
    let out = c
        .render_transition(Some(&red), Some(&blue), TransitionKind::None, 0.5, None)
        .unwrap();
    assert!(close(out.pixel(32, 18).unwrap(), RED));
}

#[test]
fn odd_canvas_is_rejected() {
    assert!(
        Compositor::new(
            Canvas {
                width: 63,
                height: 36
            },
            None
        )
        .is_err()
    );
}

#[test]
fn malformed_frame_is_an_error() {
    let mut c = compositor();
    let bad = VideoFrame {
        width: 4,
        height: 4,
        rgba: Arc::new(vec![0; 10]),
    };
    assert!(c.render_solo(Some(&bad), None).is_err());
}
