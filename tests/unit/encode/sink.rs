use super::*;

fn cfg() -> SinkConfig {
    SinkConfig {
        canvas: Canvas {
            width: 4,
            height: 2,
        },
        fps: Fps::default(),
        sample_rate: 48_000,
        channels: 2,
        format: ContainerFormat::Mp4,
        video_bitrate: 1_000_000,
        audio_bitrate: 192_000,
    }
}

fn frame(w: u32, h: u32) -> FrameRGBA {
    FrameRGBA {
        width: w,
        height: h,
        data: vec![0; (w * h * 4) as usize],
        premultiplied: true,
    }
}

#[test]
fn records_frames_and_audio_in_order() {
    let mut sink = InMemorySink::new().keeping_frames();
    let codec = sink.begin(&cfg()).unwrap();
    assert_eq!(codec.video_encoder, "libx264");

    sink.push(&frame(4, 2), &[0.1; 3200]).unwrap();
    sink.pause();
    sink.pause();
    sink.resume();
    sink.push(&frame(4, 2), &[0.2; 3200]).unwrap();
    let out = sink.finish().unwrap();

    assert_eq!(out.artifact, ArtifactRef::InMemory);
    assert!(sink.is_finished());
    assert_eq!(sink.frame_count, 2);
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(sink.audio.len(), 6400);
    assert_eq!(
        sink.events,
        vec![
            SinkEvent::Begin {
                width: 4,
                height: 2
            },
            SinkEvent::Frame {
                index: 0,
                audio_frames: 1600
            },
            SinkEvent::Pause,
            SinkEvent::Resume,
            SinkEvent::Frame {
                index: 1,
                audio_frames: 1600
            },
            SinkEvent::Finish,
        ]
    );
}

#[test]
fn push_while_paused_or_before_begin_fails() {
    let mut sink = InMemorySink::new();
    assert!(sink.push(&frame(4, 2), &[]).is_err());
    sink.begin(&cfg()).unwrap();
    sink.pause();
    assert!(sink.is_paused());
    assert!(sink.push(&frame(4, 2), &[]).is_err());
    assert_eq!(sink.frame_count, 0);
}

#[test]
fn wrong_frame_size_is_rejected() {
    let mut sink = InMemorySink::new();
    sink.begin(&cfg()).unwrap();
    assert!(matches!(
        sink.push(&frame(2, 2), &[]),
        Err(StitchError::Validation(_))
    ));
}

#[test]
fn restricted_encoders_drive_selection() {
    let mut sink = InMemorySink::new().with_encoders(["libvpx-vp9", "libopus"]);
    let codec = sink.begin(&cfg()).unwrap();
    assert_eq!(codec.container, ContainerFormat::Webm);

    let mut none = InMemorySink::new().with_encoders(Vec::<String>::new());
    assert!(matches!(
        none.begin(&cfg()),
        Err(StitchError::EncodingUnsupported(_))
    ));
}

#[test]
fn abort_discards_recording() {
    let mut sink = InMemorySink::new().keeping_frames();
    sink.begin(&cfg()).unwrap();
    sink.push(&frame(4, 2), &[0.5; 10]).unwrap();
    sink.abort();
    assert!(sink.frames.is_empty());
    assert!(sink.audio.is_empty());
    assert_eq!(sink.events.last(), Some(&SinkEvent::Abort));
    assert!(!sink.is_finished());
}
