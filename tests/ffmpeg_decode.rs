//! FFmpeg-backed decoding and full-pipeline tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;

use gifmaker::decode::{ResampleClock, resample_schedule};
use gifmaker::probe::probe_framerate;
use gifmaker::{
    Dimensions, FfmpegToolkit, FrameKind, FrameStore, GifmakerError, MediaToolkit, Pipeline,
    PipelineConfig, Stage, StageContext, decode_still,
};
use tempfile::TempDir;

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

// ── Resampling ─────────────────────────────────────────────────────

#[test]
fn resample_down_keeps_every_third_frame() {
    let times: Vec<f64> = (0..30).map(|n| n as f64 / 30.0).collect();
    let schedule = resample_schedule(&times, 10.0);
    assert_eq!(schedule, (0..10).map(|k| k * 3).collect::<Vec<_>>());
}

#[test]
fn resample_up_repeats_frames() {
    let times: Vec<f64> = (0..3).map(|n| n as f64 / 10.0).collect();
    assert_eq!(resample_schedule(&times, 20.0), vec![0, 0, 1, 1, 2]);
}

#[test]
fn resample_is_relative_to_first_frame() {
    let times = [5.0, 5.5, 6.0];
    assert_eq!(resample_schedule(&times, 2.0), vec![0, 1, 2]);
}

#[test]
fn resample_single_and_empty() {
    assert_eq!(resample_schedule(&[1.25], 4.0), vec![0]);
    assert!(resample_schedule(&[], 4.0).is_empty());
}

#[test]
fn clock_counts_claimed_slots() {
    let mut clock = ResampleClock::new(4.0);
    assert_eq!(clock.claim_before(0.0), 0);
    assert_eq!(clock.claim_before(0.5), 2);
    assert_eq!(clock.claim_through(0.5), 1);
    assert_eq!(clock.claimed(), 3);
}

// ── FFmpeg ─────────────────────────────────────────────────────────

#[test]
fn probe_sample_framerate() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let fps = probe_framerate(Path::new(path)).unwrap().unwrap();
    assert!((fps - 30.0).abs() < 0.5, "unexpected rate {fps}");
}

#[test]
fn probe_missing_file_fails() {
    let result = probe_framerate(Path::new("tests/fixtures/does_not_exist.mp4"));
    assert!(result.is_err());
}

#[test]
fn decode_writes_numbered_stills() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let store = FrameStore::open(dir.path()).unwrap();
    let mut context = StageContext::new(Stage::FramesExtracted);
    let written = FfmpegToolkit
        .decode(Path::new(path), Some(5.0), 90, &store, &mut context)
        .unwrap();

    assert!(written > 0);
    let sequence = store.enumerate(FrameKind::Still).unwrap();
    assert_eq!(sequence, (1..=written).collect::<Vec<u64>>());

    let first = decode_still(&store.read(FrameKind::Still, 1).unwrap()).unwrap();
    assert_eq!((first.width(), first.height()), (640, 480));
}

#[test]
fn resampled_decode_scales_frame_count() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let count_at = |rate: Option<f64>| {
        let dir = TempDir::new().unwrap();
        let store = FrameStore::open(dir.path()).unwrap();
        let mut context = StageContext::new(Stage::FramesExtracted);
        FfmpegToolkit
            .decode(Path::new(path), rate, 75, &store, &mut context)
            .unwrap()
    };

    let native = count_at(None);
    let third = count_at(Some(10.0));
    assert!(third < native);
    assert!((third as f64 - native as f64 / 3.0).abs() <= 2.0);
}

#[test]
fn full_pipeline_on_sample() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("sample.gif");
    let config = PipelineConfig::new("48x32".parse::<Dimensions>().unwrap())
        .with_frame_rate(5.0)
        .with_reverse(true)
        .with_scratch_dir(dir.path().join("frames"));
    let pipeline = Pipeline::new(config).unwrap();

    let report = pipeline.run(path, &output).unwrap();
    assert!(report.is_clean());
    assert!(report.decoded_frames >= 3);
    assert_eq!(report.final_sequence.len() as u64, 2 * report.decoded_frames - 2);
    assert_eq!(report.assembled_frames, report.final_sequence.len() as u64);
    assert!(output.metadata().unwrap().len() > 0);
}

#[test]
fn non_video_input_fails_decode_stage() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("bogus.mp4");
    std::fs::write(&bogus, b"definitely not a video").unwrap();

    let config = PipelineConfig::new(Dimensions::square(16).unwrap())
        .with_scratch_dir(dir.path().join("frames"));
    let pipeline = Pipeline::new(config).unwrap();

    let result = pipeline.run(&bogus, dir.path().join("out.gif"));
    assert!(matches!(
        result,
        Err(GifmakerError::StageFailed {
            stage: Stage::FramesExtracted,
            ..
        })
    ));
}
