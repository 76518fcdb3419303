use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TranscriptError;

lazy_static! {
    /// Known watch-URL shapes: `watch?v=`, `/v/`, `/e/`, `/embed/` and
    /// `youtu.be/<id>`, each followed by an 11-character id.
    static ref RE_VIDEO_ID: Regex = Regex::new(
        r#"(?i)(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#
    )
    .expect("video id pattern is valid");
}

/// Length every video id has. The content itself is opaque and not validated
/// any further.
pub const VIDEO_ID_LEN: usize = 11;

/// An 11-character opaque token identifying a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap a raw token, enforcing the length invariant.
    pub fn new(raw: impl Into<String>) -> Result<Self, TranscriptError> {
        let raw = raw.into();
        if raw.chars().count() == VIDEO_ID_LEN {
            Ok(Self(raw))
        } else {
            Err(TranscriptError::UnresolvableVideoId(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch-page URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a URL or raw identifier into a canonical [`VideoId`].
///
/// An input that is already 11 characters long is returned unchanged; this is
/// an accepted heuristic, not a full URL parser. Anything else must match one
/// of the known URL shapes.
pub fn resolve(input: &str) -> Result<VideoId, TranscriptError> {
    if input.chars().count() == VIDEO_ID_LEN {
        return VideoId::new(input);
    }

    RE_VIDEO_ID
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
        .ok_or_else(|| TranscriptError::UnresolvableVideoId(input.to_string()))
}
