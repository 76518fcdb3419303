use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, StatusCode};
use url::Url;

use super::manifest::CaptionTrack;
use super::USER_AGENT;
use crate::{TranscriptError, VideoId};

lazy_static! {
    static ref RE_TIMED_TEXT: Regex =
        Regex::new(r#"<text start="([^"]*)" dur="([^"]*)">([^<]*)</text>"#)
            .expect("timed text pattern is valid");
}

/// One timestamped caption line.
///
/// Produced only transiently; the service discards the timing and keeps the
/// text.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCue {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// Parse a timed-text body into cues, in document order.
///
/// HTML entities inside the text are left as served; an empty result is
/// valid, not an error.
pub fn parse_cues(body: &str) -> Vec<CaptionCue> {
    RE_TIMED_TEXT
        .captures_iter(body)
        .map(|caps| CaptionCue {
            start: caps[1].parse().unwrap_or(0.0),
            duration: caps[2].parse().unwrap_or(0.0),
            text: caps[3].to_string(),
        })
        .collect()
}

/// Any non-success status means the track URL no longer serves a transcript.
fn classify_status(status: StatusCode, video_id: &VideoId) -> Result<(), TranscriptError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TranscriptError::NoTranscriptAvailable(video_id.clone()))
    }
}

/// Downloads and parses the timed-text XML for a chosen caption track.
pub struct TimedTextFetcher {
    client: Client,
}

impl TimedTextFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the cues for a caption track.
    pub async fn fetch_cues(
        &self,
        track: &CaptionTrack,
        video_id: &VideoId,
        preferred_lang: Option<&str>,
    ) -> Result<Vec<CaptionCue>, TranscriptError> {
        let fetch_url = Url::parse(&track.fetch_url).map_err(|_| {
            TranscriptError::Unexpected(format!("malformed caption track URL: {}", track.fetch_url))
        })?;

        tracing::debug!(
            video_id = %video_id,
            lang = %track.language_code,
            "fetching timed text"
        );

        let mut request = self
            .client
            .get(fetch_url)
            .header(USER_AGENT_HEADER, USER_AGENT);
        if let Some(lang) = preferred_lang {
            request = request.header(ACCEPT_LANGUAGE, lang);
        }

        let response = request.send().await?;
        classify_status(response.status(), video_id)?;

        let body = response.text().await?;
        Ok(parse_cues(&body))
    }
}
