use super::*;
use crate::model::{Clip, ClipStatus, TransitionKind};

fn three_clips() -> Vec<Clip> {
    vec![
        Clip::new("a", "a.mp4", 8.0).with_transition(TransitionKind::Fade, 1.0),
        Clip::new("b", "b.mp4", 8.0).with_transition(TransitionKind::None, 1.0),
        Clip::new("c", "c.mp4", 8.0),
    ]
}

#[test]
fn empty_completed_list_is_rejected() {
    let clips = vec![
        Clip::new("a", "a.mp4", 4.0).with_status(ClipStatus::Generating),
        Clip::new("b", "b.mp4", 4.0).with_status(ClipStatus::Failed),
    ];
    assert!(matches!(
        Timeline::from_clips(&clips),
        Err(StitchError::EmptyTimeline)
    ));
    assert!(matches!(
        Timeline::from_clips(&[]),
        Err(StitchError::EmptyTimeline)
    ));
}

#[test]
fn only_completed_clips_participate_in_order() {
    let clips = vec![
        Clip::new("a", "a.mp4", 4.0),
        Clip::new("b", "b.mp4", 4.0).with_status(ClipStatus::Pending),
        Clip::new("c", "c.mp4", 4.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    let ids: Vec<&str> = tl.clips().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn over_trim_is_an_invalid_trim_error() {
    let clips = vec![Clip::new("a", "a.mp4", 4.0).with_trim(2.0, 2.0)];
    assert!(matches!(
        Timeline::from_clips(&clips),
        Err(StitchError::InvalidTrim { .. })
    ));
    let clips = vec![Clip::new("a", "a.mp4", 4.0).with_trim(f64::NAN, 0.0)];
    assert!(matches!(
        Timeline::from_clips(&clips),
        Err(StitchError::InvalidTrim { .. })
    ));
}

#[test]
fn negative_trims_clamp_to_zero() {
    let clips = vec![Clip::new("a", "a.mp4", 4.0).with_trim(-1.0, -0.5)];
    let tl = Timeline::from_clips(&clips).unwrap();
    assert_eq!(
        tl.window(0),
        ClipWindow {
            trim_start: 0.0,
            native_end: 4.0
        }
    );
}

#[test]
fn negative_transition_duration_is_rejected() {
    let clips = vec![
        Clip::new("a", "a.mp4", 4.0).with_transition(TransitionKind::Fade, -1.0),
        Clip::new("b", "b.mp4", 4.0),
    ];
    assert!(matches!(
        Timeline::from_clips(&clips),
        Err(StitchError::Validation(_))
    ));
}

#[test]
fn solo_end_subtracts_outgoing_transition() {
    let clips = vec![
        Clip::new("a", "a.mp4", 8.0)
            .with_trim(1.0, 0.5)
            .with_transition(TransitionKind::WipeLeft, 2.0),
        Clip::new("b", "b.mp4", 8.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    assert_eq!(tl.solo_end(0), 5.5);
    assert_eq!(tl.solo_end(1), 8.0);
}

#[test]
fn transition_on_last_clip_is_meaningless() {
    let clips = vec![Clip::new("a", "a.mp4", 8.0).with_transition(TransitionKind::Fade, 1.0)];
    let tl = Timeline::from_clips(&clips).unwrap();
    assert_eq!(tl.transition_after(0), None);
    assert_eq!(tl.solo_end(0), 8.0);
    assert!((tl.estimated_duration_secs() - 8.0).abs() < 1e-9);
}

#[test]
fn none_kind_is_a_hard_cut() {
    let tl = Timeline::from_clips(&three_clips()).unwrap();
    assert_eq!(
        tl.transition_after(0),
        Some(Transition {
            kind: TransitionKind::Fade,
            duration: 1.0
        })
    );
    assert_eq!(tl.transition_after(1), None);
}

#[test]
fn transition_is_counted_once_across_the_pair() {
    let tl = Timeline::from_clips(&three_clips()).unwrap();
    assert!((tl.duration_contribution(0) - 7.5).abs() < 1e-9);
    assert!((tl.duration_contribution(1) - 7.5).abs() < 1e-9);
    assert!((tl.duration_contribution(2) - 8.0).abs() < 1e-9);
    assert!((tl.estimated_duration_secs() - 23.0).abs() < 1e-9);
}

#[test]
fn transition_is_clamped_to_play_windows() {
    let clips = vec![
        Clip::new("a", "a.mp4", 3.0).with_transition(TransitionKind::Fade, 2.0),
        Clip::new("b", "b.mp4", 3.0).with_transition(TransitionKind::Fade, 2.0),
        Clip::new("c", "c.mp4", 1.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    assert_eq!(tl.transition_after(0).unwrap().duration, 2.0);
    // Only 1s of clip b is left after its incoming transition, and clip c is 1s long.
    assert_eq!(tl.transition_after(1).unwrap().duration, 1.0);
}

#[test]
fn zero_duration_transition_is_a_cut() {
    let clips = vec![
        Clip::new("a", "a.mp4", 3.0).with_transition(TransitionKind::Fade, 0.0),
        Clip::new("b", "b.mp4", 3.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    assert_eq!(tl.transition_after(0), None);
}
