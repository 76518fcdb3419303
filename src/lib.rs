//! tubescribe - A Rust CLI tool and library for extracting YouTube video transcripts
//!
//! Transcripts are acquired through a layered fallback: the caption manifest
//! embedded in the watch page, then the timed-text XML endpoint, and finally
//! (for embedders that supply a live page backend) the rendered transcript
//! panel itself. Optionally the raw transcript can be reformatted through an
//! OpenAI-compatible chat-completion API.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod format;
pub mod service;
pub mod video;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{CaptionTrack, ExtractionStrategy};
pub use service::{ExtractionOutcome, TranscriptService};
pub use video::VideoId;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Everything that can go wrong while acquiring a transcript.
///
/// The first six variants come from the structured path (watch page +
/// timed-text endpoint); the three panel variants come from the DOM fallback.
/// `Network` and `Unexpected` are the catch-alls for failures the host never
/// classified for us.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("could not extract a video id from '{0}'")]
    UnresolvableVideoId(String),

    #[error("YouTube is receiving too many requests from this IP and now requires solving a captcha to continue")]
    TooManyRequests,

    #[error("the video is no longer available ({0})")]
    VideoUnavailable(VideoId),

    #[error("transcript is disabled on this video ({0})")]
    CaptionsDisabled(VideoId),

    #[error("no transcripts are available for this video ({0})")]
    NoTranscriptAvailable(VideoId),

    #[error("no transcript is available in {lang} for this video. Available languages: {}", .available.join(", "))]
    LanguageNotAvailable { lang: String, available: Vec<String> },

    #[error("transcript not available for this video (no transcript control found in the page)")]
    TranscriptNotAvailable,

    #[error("could not find the transcript panel")]
    TranscriptPanelMissing,

    #[error("no transcript segments found")]
    NoSegmentsFound,

    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Unexpected(String),
}

impl TranscriptError {
    /// The video id the failure refers to, when the error carries one.
    pub fn video_id(&self) -> Option<&VideoId> {
        match self {
            Self::VideoUnavailable(id)
            | Self::CaptionsDisabled(id)
            | Self::NoTranscriptAvailable(id) => Some(id),
            _ => None,
        }
    }

    /// Stable machine-readable name for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnresolvableVideoId(_) => "unresolvable_video_id",
            Self::TooManyRequests => "too_many_requests",
            Self::VideoUnavailable(_) => "video_unavailable",
            Self::CaptionsDisabled(_) => "captions_disabled",
            Self::NoTranscriptAvailable(_) => "no_transcript_available",
            Self::LanguageNotAvailable { .. } => "language_not_available",
            Self::TranscriptNotAvailable => "transcript_not_available",
            Self::TranscriptPanelMissing => "transcript_panel_missing",
            Self::NoSegmentsFound => "no_segments_found",
            Self::Network(_) => "network",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
