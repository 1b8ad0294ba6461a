//! Integration tests for audio routing through the session.

use reelsync_audio::{AudioGraph, Channel, SourceKey};
use reelsync_core::{AudioSpec, ClipId};
use reelsync_media::{MediaResource, SimulatedMedia};

use crate::support::Studio;

fn drain_monitor(studio: &Studio) -> Vec<f32> {
    studio
        .session
        .audio()
        .monitor_output()
        .map(|buffer| buffer.drain())
        .unwrap_or_default()
}

#[test]
fn connecting_twice_keeps_one_connection() {
    let mut graph = AudioGraph::new(AudioSpec::new(48_000, 2), 4096, None);
    let key = SourceKey::Clip(ClipId::new());
    assert!(graph.connect(key));
    assert!(!graph.connect(key));
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn replaying_does_not_duplicate_connections() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.clip("b", SimulatedMedia::video(2.0));
    studio
        .session
        .load_external_audio(&MediaResource::named("missing-track"));

    for _ in 0..3 {
        studio.session.play();
        studio.step();
        studio.session.pause().unwrap();
    }
    studio.session.play();
    // two clips plus the external track
    assert_eq!(studio.session.audio().connection_count(), 3);
}

#[test]
fn every_channel_reaches_the_mix() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0).with_audio_level(Some(0.1)));
    studio.ingest.insert("pip", SimulatedMedia::video(3.0).with_audio_level(Some(0.2)));
    studio.ingest.insert("music", SimulatedMedia::audio(10.0).with_audio_level(Some(0.3)));
    studio.session.load_overlay(&MediaResource::named("pip"));
    studio.session.load_external_audio(&MediaResource::named("music"));

    studio.session.play();
    studio.step();
    drain_monitor(&studio);
    studio.step();
    let mixed = drain_monitor(&studio);
    assert!(!mixed.is_empty());
    assert!(mixed.iter().all(|s| (s - 0.6).abs() < 1e-5));
}

#[test]
fn channel_gain_scales_its_sources() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0).with_audio_level(Some(0.4)));
    studio.ingest.insert("music", SimulatedMedia::audio(10.0).with_audio_level(Some(0.2)));
    studio
        .session
        .load_external_audio(&MediaResource::named("music"));
    studio.session.set_channel_gain(Channel::Main, 0.0);
    studio.session.set_channel_gain(Channel::External, 0.5);

    studio.session.play();
    studio.step();
    drain_monitor(&studio);
    studio.step();
    let mixed = drain_monitor(&studio);
    assert!(!mixed.is_empty());
    assert!(mixed.iter().all(|s| (s - 0.1).abs() < 1e-5));
}

#[test]
fn paused_sources_are_silent() {
    let (mut studio, _) = Studio::new();
    studio.clip("a", SimulatedMedia::video(3.0));
    studio.session.play();
    studio.step();
    studio.session.pause().unwrap();
    drain_monitor(&studio);

    studio.step();
    let mixed = drain_monitor(&studio);
    assert!(mixed.iter().all(|s| *s == 0.0));
}

#[test]
fn gains_appear_in_snapshot() {
    let (mut studio, _) = Studio::new();
    studio.session.set_channel_gain(Channel::Overlay, 0.25);
    studio.session.set_channel_gain(Channel::External, 3.0);
    let gains = studio.session.snapshot().gains;
    assert_eq!(gains.main, 1.0);
    assert_eq!(gains.overlay, 0.25);
    assert_eq!(gains.external, 1.0);
}
