use super::*;
use crate::model::{Clip, TransitionKind};

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn single_clip_duration_is_the_trimmed_window() {
    let clips = vec![Clip::new("a", "a.mp4", 6.0).with_trim(1.0, 0.5)];
    let tl = Timeline::from_clips(&clips).unwrap();
    let plan = plan_timeline(&tl, fps30());
    assert_eq!(plan.total_frames, 135);
    assert_eq!(plan.transition_frames, 0);
    assert!((plan.duration_secs() - 4.5).abs() < 1e-9);
    assert_eq!(
        plan.steps,
        vec![
            Step::Load {
                clip: 0,
                seek_to: 1.0
            },
            Step::Swap,
            Step::Solo {
                clip: 0,
                frames: 135
            },
        ]
    );
}

#[test]
fn fade_then_cut_scenario_is_23_seconds() {
    let clips = vec![
        Clip::new("a", "a.mp4", 8.0).with_transition(TransitionKind::Fade, 1.0),
        Clip::new("b", "b.mp4", 8.0).with_transition(TransitionKind::None, 1.0),
        Clip::new("c", "c.mp4", 8.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    let plan = plan_timeline(&tl, fps30());
    assert_eq!(plan.total_frames, 23 * 30);
    assert_eq!(plan.transition_frames, 30);
    assert_eq!(
        plan.steps,
        vec![
            Step::Load {
                clip: 0,
                seek_to: 0.0
            },
            Step::Swap,
            Step::Solo {
                clip: 0,
                frames: 210
            },
            Step::Load {
                clip: 1,
                seek_to: 0.0
            },
            Step::Transition {
                outgoing: 0,
                incoming: 1,
                kind: TransitionKind::Fade,
                duration: 1.0,
                frames: 30
            },
            Step::Swap,
            Step::Solo {
                clip: 1,
                frames: 210
            },
            Step::Load {
                clip: 2,
                seek_to: 0.0
            },
            Step::Swap,
            Step::Solo {
                clip: 2,
                frames: 240
            },
        ]
    );
}

#[test]
fn overlap_window_equals_transition_duration() {
    let clips = vec![
        Clip::new("a", "a.mp4", 5.0).with_transition(TransitionKind::SlideLeft, 1.5),
        Clip::new("b", "b.mp4", 5.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    let plan = plan_timeline(&tl, fps30());
    assert_eq!(plan.transition_frames, 45);
    assert_eq!(plan.total_frames, 255);
}

#[test]
fn fractional_boundaries_do_not_drift() {
    let clips: Vec<Clip> = (0..10)
        .map(|i| Clip::new(format!("c{i}"), "x.mp4", 1.01))
        .collect();
    let tl = Timeline::from_clips(&clips).unwrap();
    let plan = plan_timeline(&tl, fps30());
    // 10.1s at 30fps is exactly 303 frames even though each clip alone rounds to 30.
    assert_eq!(plan.total_frames, 303);
}

#[test]
fn locate_maps_frames_to_steps() {
    let clips = vec![
        Clip::new("a", "a.mp4", 2.0).with_transition(TransitionKind::Fade, 1.0),
        Clip::new("b", "b.mp4", 2.0),
    ];
    let tl = Timeline::from_clips(&clips).unwrap();
    let plan = plan_timeline(&tl, fps30());
    assert_eq!(plan.locate(0), Some((2, 0)));
    assert_eq!(plan.locate(30), Some((4, 0)));
    assert_eq!(plan.locate(59), Some((4, 29)));
    assert_eq!(plan.locate(60), Some((6, 0)));
    assert_eq!(plan.locate(plan.total_frames), None);
}
