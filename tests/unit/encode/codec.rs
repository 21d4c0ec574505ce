use super::*;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn requested_container_wins_when_available() {
    let c = select_codec(ContainerFormat::Mp4, &set(&["libx264", "aac", "libvpx-vp9", "libopus"]))
        .unwrap();
    assert_eq!(c.container, ContainerFormat::Mp4);
    assert_eq!((c.video_encoder, c.audio_encoder), ("libx264", "aac"));
}

#[test]
fn later_preference_is_used_when_first_is_missing() {
    let c = select_codec(ContainerFormat::Mp4, &set(&["mpeg4", "aac"])).unwrap();
    assert_eq!(c.video_encoder, "mpeg4");
}

#[test]
fn falls_back_to_other_container() {
    let c = select_codec(ContainerFormat::Mp4, &set(&["libvpx", "libvorbis"])).unwrap();
    assert_eq!(c.container, ContainerFormat::Webm);
    assert_eq!(c.to_string(), "webm (libvpx + libvorbis)");
}

#[test]
fn video_without_matching_audio_is_not_enough() {
    let err = select_codec(ContainerFormat::Webm, &set(&["libx264", "libvpx-vp9"])).unwrap_err();
    assert!(matches!(err, StitchError::EncodingUnsupported(_)));
}

#[test]
fn parse_encoders_reads_table_rows_only() {
    let listing = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D libvpx-vp9           libvpx VP9
 A....D aac                  AAC (Advanced Audio Coding)
 S..... srt                  SubRip subtitle
";
    let found = parse_encoders(listing);
    assert_eq!(found, set(&["aac", "libvpx-vp9", "libx264", "srt"]));
}
