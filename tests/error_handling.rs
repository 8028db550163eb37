//! Error classification and message tests.

use std::error::Error;
use std::io;
use std::time::Duration;

use gifmaker::{CancellationToken, GifmakerError, Stage};

#[test]
fn collaborator_failures_are_classified() {
    let collaborator = [
        GifmakerError::NoVideoStream,
        GifmakerError::VideoDecodeError("bad".into()),
        GifmakerError::FfmpegError("bad".into()),
        GifmakerError::GifEncodeError("bad".into()),
        GifmakerError::GifDecodeError("bad".into()),
        GifmakerError::EmptySequence("still"),
        GifmakerError::StageTimeout {
            stage: Stage::Resized,
            limit: Duration::from_secs(1),
        },
    ];
    for error in &collaborator {
        assert!(error.is_collaborator_failure(), "{error}");
    }

    let fatal = [
        GifmakerError::InvalidDecimation(1),
        GifmakerError::InvalidQuality(120),
        GifmakerError::StaleFrames { count: 3 },
        GifmakerError::Cancelled {
            after: Stage::Decimated,
        },
        GifmakerError::Scratch {
            path: "frames/00001.jpg".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        },
    ];
    for error in &fatal {
        assert!(!error.is_collaborator_failure(), "{error}");
    }
}

#[test]
fn stage_failed_names_stage_and_keeps_source() {
    let error = GifmakerError::StageFailed {
        stage: Stage::IntermediateEncoded,
        source: Box::new(GifmakerError::GifEncodeError("palette overflow".into())),
    };
    let message = error.to_string();
    assert!(message.starts_with("encode intermediate stage failed"));
    assert!(message.contains("palette overflow"));
    assert!(error.source().is_some());
}

#[test]
fn messages_mention_details() {
    let timeout = GifmakerError::StageTimeout {
        stage: Stage::FramesExtracted,
        limit: Duration::from_secs(30),
    };
    assert!(timeout.to_string().contains("extract frames"));
    assert!(timeout.to_string().contains("30s"));

    let stale = GifmakerError::StaleFrames { count: 12 };
    assert!(stale.to_string().contains("12"));

    let cancelled = GifmakerError::Cancelled {
        after: Stage::Reversed,
    };
    assert!(cancelled.to_string().contains("reverse"));
}

#[test]
fn io_error_converts() {
    let error: GifmakerError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(error, GifmakerError::IoError(_)));
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}
