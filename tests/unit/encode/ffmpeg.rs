use super::*;
use crate::foundation::core::{Canvas, Fps};
use crate::media::ffmpeg::ffmpeg_tools_available;

#[test]
fn flatten_premul_over_black_produces_expected_rgb() {
    // Premultiplied red @ 50% alpha => rgb is 128,0,0 when premul.
    let src = vec![128u8, 0u8, 0u8, 128u8];
    let mut dst = vec![0u8; 4];
    flatten_to_opaque_rgba8(&mut dst, &src, true, [0, 0, 0, 255]).unwrap();
    assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
}

#[test]
fn flatten_straight_over_white_blends_background() {
    let src = vec![255u8, 0u8, 0u8, 128u8];
    let mut dst = vec![0u8; 4];
    flatten_to_opaque_rgba8(&mut dst, &src, false, [255, 255, 255, 255]).unwrap();
    assert_eq!(dst, vec![255u8, 127u8, 127u8, 255u8]);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_to_opaque_rgba8(&mut dst, &[0u8; 4], true, [0, 0, 0, 255]).is_err());
}

#[test]
fn part_files_sit_next_to_output() {
    let p = part_path(Path::new("out/movie.mp4"), "video.part");
    assert_eq!(p, PathBuf::from("out/movie.mp4.video.part"));
}

#[test]
fn output_extension_follows_selected_container() {
    let sink = FfmpegSink::new("out/movie.mp4", true);
    assert_eq!(
        sink.output_path_for(ContainerFormat::Webm),
        PathBuf::from("out/movie.webm")
    );
    assert_eq!(
        sink.output_path_for(ContainerFormat::Mp4),
        PathBuf::from("out/movie.mp4")
    );
}

#[test]
fn begin_without_usable_encoders_fails_before_spawning() {
    let dir = std::env::temp_dir().join(format!("reelstitch_noenc_{}", std::process::id()));
    let mut sink = FfmpegSink::new(dir.join("x.mp4"), true).with_encoders(BTreeSet::new());
    let err = sink.begin(&small_cfg()).unwrap_err();
    assert!(matches!(err, StitchError::EncodingUnsupported(_)));
    assert!(!dir.join("x.mp4").exists());
}

#[test]
fn unwritable_audio_spool_fails_without_leaving_a_video_part() {
    let dir = std::env::temp_dir().join(format!("reelstitch_spool_{}", std::process::id()));
    let out = dir.join("blocked.mp4");
    let spool = part_path(&out, "audio.f32le.part");
    std::fs::create_dir_all(&spool).unwrap();

    let encoders: BTreeSet<String> = ["libx264", "aac"].into_iter().map(String::from).collect();
    let mut sink = FfmpegSink::new(&out, true).with_encoders(encoders);
    assert!(sink.begin(&small_cfg()).is_err());
    assert!(!part_path(&out, "video.part").exists());
    assert!(!out.exists());

    sink.abort();
    let _ = std::fs::remove_dir_all(&dir);
}

fn small_cfg() -> SinkConfig {
    SinkConfig {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        fps: Fps::default(),
        sample_rate: 48_000,
        channels: 2,
        format: ContainerFormat::Mp4,
        video_bitrate: 500_000,
        audio_bitrate: 128_000,
    }
}

#[test]
fn encodes_and_muxes_a_short_movie() {
    if !ffmpeg_tools_available() {
        return;
    }
    let dir = std::env::temp_dir().join(format!("reelstitch_sink_{}", std::process::id()));
    let out = dir.join("tiny.mp4");
    let mut sink = FfmpegSink::new(&out, true);
    let codec = match sink.begin(&small_cfg()) {
        Ok(c) => c,
        Err(StitchError::EncodingUnsupported(_)) => return,
        Err(e) => panic!("begin failed: {e}"),
    };

    let frame = FrameRGBA {
        width: 64,
        height: 36,
        data: [20u8, 40, 60, 255].repeat(64 * 36),
        premultiplied: true,
    };
    for _ in 0..10 {
        sink.push(&frame, &[0.0; 3200]).unwrap();
    }
    let output = sink.finish().unwrap();
    assert_eq!(output.codec, codec);
    let ArtifactRef::File(path) = output.artifact else {
        panic!("expected a file artifact");
    };
    assert!(path.exists());
    assert!(!part_path(&path, "video.part").exists());
    assert!(!part_path(&path, "audio.f32le.part").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn abort_removes_partial_output() {
    if !ffmpeg_tools_available() {
        return;
    }
    let dir = std::env::temp_dir().join(format!("reelstitch_abort_{}", std::process::id()));
    let out = dir.join("gone.mp4");
    let mut sink = FfmpegSink::new(&out, true);
    let Ok(codec) = sink.begin(&small_cfg()) else {
        return;
    };
    let final_path = sink.output_path_for(codec.container);
    sink.abort();
    assert!(!final_path.exists());
    assert!(!part_path(&final_path, "video.part").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
