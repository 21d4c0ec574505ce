use super::*;
use crate::media::source::{MediaProvider, OpenOptions};
use crate::media::synthetic::{SyntheticMedia, SyntheticProvider};
use crate::model::MediaRef;

fn provider() -> SyntheticProvider {
    SyntheticProvider::new()
        .with("short", SyntheticMedia::solid(0.1, 4, 4, [9, 9, 9, 255]).with_audio(0.5, 0.5))
}

fn bind_ready(slot: &mut Slot, p: &SyntheticProvider, index: usize) {
    let stream = p
        .open(&MediaRef::new("short"), &OpenOptions::default())
        .unwrap();
    slot.bind(index, &format!("clip{index}"), stream);
    slot.stream_mut().unwrap().seek(0.0).unwrap();
    slot.mark_seeked();
}

#[test]
fn roles_start_with_a_as_standby_and_flip_on_swap() {
    let mut pool = SlotPool::new();
    assert_eq!(pool.standby_id(), SlotId::A);
    assert_eq!(pool.current_id(), SlotId::B);
    assert_eq!(pool.role_of(SlotId::A), SlotRole::Standby);

    pool.swap();
    assert_eq!(pool.current_id(), SlotId::A);
    assert_eq!(pool.role_of(SlotId::B), SlotRole::Standby);

    let (cur, standby) = pool.pair_mut();
    assert_eq!(cur.id(), SlotId::A);
    assert_eq!(standby.id(), SlotId::B);
}

#[test]
fn swap_restores_full_volume_and_stops_outgoing() {
    let p = provider();
    let mut pool = SlotPool::new();
    bind_ready(pool.standby_mut(), &p, 0);
    pool.swap();
    bind_ready(pool.standby_mut(), &p, 1);

    pool.current_mut().set_volume(0.25);
    pool.standby_mut().set_volume(0.0);
    pool.swap();

    assert_eq!(pool.current().clip_index(), Some(1));
    assert_eq!(pool.current().volume(), 1.0);
    assert_eq!(pool.standby().volume(), 1.0);
    assert!(!pool.standby().is_ready(), "outgoing slot is stopped");
    assert!(pool.standby().has_media());
}

#[test]
fn volume_is_clamped() {
    let mut pool = SlotPool::new();
    pool.current_mut().set_volume(3.0);
    assert_eq!(pool.current().volume(), 1.0);
    pool.current_mut().set_volume(-1.0);
    assert_eq!(pool.current().volume(), 0.0);
}

#[test]
fn pulling_before_seek_is_an_error() {
    let mut pool = SlotPool::new();
    assert!(pool.current_mut().pull_frame().is_err());
}

#[test]
fn exhausted_media_holds_last_frame() {
    let p = provider();
    let mut pool = SlotPool::new();
    bind_ready(pool.standby_mut(), &p, 0);
    let slot = pool.standby_mut();
    // 0.1s at 30 fps rounds to 3 frames.
    for _ in 0..5 {
        let frame = slot.pull_frame().unwrap().expect("frame held");
        assert_eq!(&frame.rgba[..4], &[9, 9, 9, 255]);
    }
}

#[test]
fn pull_audio_reads_bound_media_or_silence() {
    let p = provider();
    let mut pool = SlotPool::new();
    let mut out = Vec::new();
    pool.current_mut().pull_audio(4, &mut out).unwrap();
    assert_eq!(out, vec![0.0; 8]);

    bind_ready(pool.standby_mut(), &p, 0);
    out.clear();
    pool.standby_mut().pull_audio(4, &mut out).unwrap();
    assert_eq!(out, vec![0.5; 8]);
}

#[test]
fn release_drops_streams() {
    let p = provider();
    {
        let mut pool = SlotPool::new();
        bind_ready(pool.standby_mut(), &p, 0);
        pool.swap();
        bind_ready(pool.standby_mut(), &p, 1);
        assert_eq!(p.live_streams(), 2);
        pool.standby_mut().release();
        assert_eq!(p.live_streams(), 1);
        assert_eq!(pool.standby().clip_id(), None);
    }
    assert_eq!(p.live_streams(), 0);
}

#[test]
fn clip_phases_follow_the_lifecycle() {
    let mut phase = ClipPhase::default();
    assert_eq!(phase, ClipPhase::Init);
    phase.advance(ClipPhase::SoloPlay).unwrap();
    phase.advance(ClipPhase::Transitioning).unwrap();
    phase.advance(ClipPhase::Swap).unwrap();
    phase.advance(ClipPhase::Done).unwrap();

    let mut cut = ClipPhase::SoloPlay;
    cut.advance(ClipPhase::Swap).unwrap();

    let mut bad = ClipPhase::Init;
    assert!(bad.advance(ClipPhase::Transitioning).is_err());
    assert_eq!(bad, ClipPhase::Init);
    assert!(!ClipPhase::Done.can_advance_to(ClipPhase::SoloPlay));
}
