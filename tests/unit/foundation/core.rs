use super::*;

#[test]
fn fps_validation_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::new(30, 1).unwrap(), Fps::default());
}

#[test]
fn fps_rounds_seconds_to_nearest_frame() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.secs_to_frames_round(1.0), 30);
    assert_eq!(fps.secs_to_frames_round(0.49 / 30.0), 0);
    assert_eq!(fps.secs_to_frames_round(23.0), 690);
    assert!((fps.frames_to_secs(45) - 1.5).abs() < 1e-12);
}

#[test]
fn canvas_requires_even_non_zero_dims() {
    assert!(Canvas { width: 0, height: 2 }.validate().is_err());
    assert!(Canvas { width: 11, height: 10 }.validate().is_err());
    assert!(Canvas { width: 1280, height: 720 }.validate().is_ok());
    assert_eq!(Canvas { width: 720, height: 1280 }.short_edge(), 720);
}

#[test]
fn frame_pixel_reads_row_major() {
    let frame = FrameRGBA {
        width: 2,
        height: 1,
        data: vec![1, 2, 3, 4, 5, 6, 7, 8],
        premultiplied: true,
    };
    assert_eq!(frame.pixel(1, 0), Some([5, 6, 7, 8]));
    assert_eq!(frame.pixel(2, 0), None);
}
