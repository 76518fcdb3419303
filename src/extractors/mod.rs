use async_trait::async_trait;

pub mod dom;
pub mod manifest;
pub mod timedtext;

pub use dom::{DomFallbackExtractor, ElementHandle, PageDom};
pub use manifest::{CaptionManifestFetcher, CaptionTrack, ManifestExtractor};
pub use timedtext::{CaptionCue, TimedTextFetcher};

use crate::{TranscriptError, VideoId};

/// The host serves different markup to unrecognized clients, so every request
/// impersonates a desktop browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_4) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.83 Safari/537.36,gzip(gfe)";

/// A single way of turning a video into transcript text.
///
/// The service tries strategies in order until one succeeds, so each strategy
/// owns its complete failure classification and never retries internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Name of the strategy (for logging)
    fn name(&self) -> &'static str;

    /// Produce the full transcript text for the video, or a classified failure.
    async fn extract<'a>(
        &self,
        video_id: &VideoId,
        preferred_lang: Option<&'a str>,
    ) -> Result<String, TranscriptError>;
}

/// Join cue texts the way the service publishes them: space-joined, trimmed.
pub(crate) fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for segment in segments {
        out.push_str(segment.as_ref());
        out.push(' ');
    }
    out.trim().to_string()
}
