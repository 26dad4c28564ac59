// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end runs of the driver against the behavioral playback model.

use cosim::{
    verify, AudioChannel, AudioFlags, HardwareModel, Mismatch, PlaybackModel, PlaybackOptions,
    RunConfig, Session, StopReason, Volumes, MEMORY_CAPACITY_WORDS,
};
use std::path::Path;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn channel(start: u32, end: u32) -> AudioChannel {
    AudioChannel {
        sample_start_address: start,
        sample_end_address: end,
        sample_loop_address: start,
        flags: AudioFlags::default(),
        volumes: Volumes {
            left: 0x40,
            right: 0x40,
        },
        pitch: 0x1000,
    }
}

fn config(test_duration: u64) -> RunConfig {
    RunConfig {
        sample_path: "samples.bin".into(),
        test_duration,
        sample_count: u64::MAX,
    }
}

fn payload(words: impl Iterator<Item = i16>) -> Vec<u8> {
    words.flat_map(|word| word.to_le_bytes()).collect()
}

#[test]
fn single_channel_plays_to_its_end() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    let channels = [channel(0, 0x1000)];
    let mut session = Session::new(model, &channels, &[0; 0x1000], &config(100_000)).unwrap();
    let summary = session.run();

    assert_eq!(summary.stop, StopReason::ChannelsEnded);
    assert!(summary.stop.end_reached());
    assert!(summary.time < 100_000);
    // 0x1000 bytes hold 0x800 words, one per frame at unity pitch.
    assert_eq!(summary.frames, 0x800);
    assert!(session.captures().audio.iter().all(|sample| *sample == 0));
}

#[test]
fn captures_mixed_samples_in_order() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    let channels = [channel(0, 0x800)];
    let samples = payload((0..0x400).map(|i| i * 2));
    let mut session = Session::new(model, &channels, &samples, &config(100_000)).unwrap();
    session.run();

    let audio = &session.captures().audio;
    assert_eq!(audio.len(), 0x800);
    for (frame, pair) in audio.chunks(2).enumerate() {
        // Half volume on both sides.
        assert_eq!(pair, [frame as i16, frame as i16]);
    }
}

#[test]
fn every_channel_must_end() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    // The second channel is four times longer than the first.
    let channels = [channel(0, 0x800), channel(0, 0x2000)];
    let mut session = Session::new(model, &channels, &[], &config(1_000_000)).unwrap();
    let summary = session.run();

    assert_eq!(summary.stop, StopReason::ChannelsEnded);
    assert_eq!(summary.frames, 0x1000);
    assert_eq!(session.model().pins().host_read_data, 0x03);
}

#[test]
fn zero_end_channel_reads_to_top_of_memory() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    let channels = [channel(0, 0x1000), channel(0, 0)];
    let mut config = config(100_000);
    config.sample_count = 0x900;
    let mut session = Session::new(model, &channels, &[0; 16], &config).unwrap();
    assert_eq!(session.memory().len(), MEMORY_CAPACITY_WORDS);

    // The second channel keeps playing past the end of the first.
    let summary = session.run();
    assert_eq!(summary.stop, StopReason::SampleCountReached);
    assert_eq!(summary.frames, 0x900);
    assert_eq!(session.model().pins().host_read_data, 0x01);
}

#[test]
fn looping_channel_times_out() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    let mut looping = channel(0, 0x800);
    looping.flags = AudioFlags::LOOP;
    let mut session = Session::new(model, &[looping], &[], &config(20_000)).unwrap();
    let summary = session.run();

    assert_eq!(summary.stop, StopReason::TimedOut);
    assert!(!summary.stop.end_reached());
    assert_eq!(summary.time, 20_000);
    assert!(summary.frames > 0x400);
}

#[test]
fn sample_count_bounds_the_capture() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    let mut config = config(100_000);
    config.sample_count = 100;
    let mut session = Session::new(model, &[channel(0, 0x1000)], &[], &config).unwrap();
    let summary = session.run();

    assert_eq!(summary.stop, StopReason::SampleCountReached);
    assert_eq!(session.captures().audio.len(), 200);
}

#[test]
fn stalled_host_port_delays_playback() {
    init();
    let run = |write_stall_cycles| {
        let model = PlaybackModel::new(PlaybackOptions {
            write_stall_cycles,
            ..Default::default()
        });
        let mut session =
            Session::new(model, &[channel(0, 0x800)], &[], &config(100_000)).unwrap();
        let summary = session.run();
        assert_eq!(summary.stop, StopReason::ChannelsEnded);
        assert_eq!(summary.writes, 7);
        (summary.time, session.into_captures())
    };

    let (fast_time, fast) = run(0);
    let (slow_time, slow) = run(5);
    // Seven writes, five extra cycles each, two ticks per cycle.
    assert_eq!(slow_time - fast_time, 7 * 5 * 2);
    assert_eq!(fast.audio, slow.audio);
}

#[test]
fn timed_out_run_without_audio_fails_verification() {
    init();
    let model = PlaybackModel::new(PlaybackOptions::default());
    let mut session = Session::new(model, &[channel(0, 0x800)], &[], &config(4)).unwrap();
    let summary = session.run();
    assert_eq!(summary.stop, StopReason::TimedOut);
    assert_eq!(summary.frames, 0);

    let verdict = verify(
        session.captures(),
        Path::new("/nonexistent/adpcm_reference.json"),
        Path::new("/nonexistent/reference.wav"),
    );
    assert!(!verdict.passed());
    assert_eq!(verdict.audio.mismatch, Some(Mismatch::NoAudioCaptured));
    assert!(matches!(
        verdict.debug.mismatch,
        Some(Mismatch::Reference(_))
    ));
}
