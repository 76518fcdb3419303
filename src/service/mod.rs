use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::extractors::manifest::{select_track, CaptionManifestFetcher};
use crate::extractors::timedtext::TimedTextFetcher;
use crate::extractors::{join_segments, DomFallbackExtractor, ExtractionStrategy, PageDom};
use crate::format::TranscriptFormatter;
use crate::video::{self, VideoId};
use crate::TranscriptError;

/// Language requested when the caller does not name one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// The structured path: embedded-JSON manifest, then timed-text XML.
pub struct StructuredStrategy {
    manifest: CaptionManifestFetcher,
    timedtext: TimedTextFetcher,
}

impl StructuredStrategy {
    pub fn new(client: Client) -> Self {
        Self {
            manifest: CaptionManifestFetcher::new(client.clone()),
            timedtext: TimedTextFetcher::new(client),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    async fn extract<'a>(
        &self,
        video_id: &VideoId,
        preferred_lang: Option<&'a str>,
    ) -> Result<String, TranscriptError> {
        let tracks = self.manifest.fetch_manifest(video_id, preferred_lang).await?;
        let track = select_track(&tracks, preferred_lang)
            .ok_or_else(|| TranscriptError::NoTranscriptAvailable(video_id.clone()))?;
        let cues = self
            .timedtext
            .fetch_cues(track, video_id, preferred_lang)
            .await?;
        // An empty cue list is a valid empty transcript, not a failure.
        Ok(join_segments(cues.iter().map(|cue| cue.text.as_str())))
    }
}

/// The last resort: scrape the rendered transcript panel.
pub struct DomFallbackStrategy {
    extractor: DomFallbackExtractor,
}

impl DomFallbackStrategy {
    pub fn new(dom: Arc<dyn PageDom>) -> Self {
        Self {
            extractor: DomFallbackExtractor::new(dom),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for DomFallbackStrategy {
    fn name(&self) -> &'static str {
        "dom-fallback"
    }

    async fn extract<'a>(
        &self,
        _video_id: &VideoId,
        _preferred_lang: Option<&'a str>,
    ) -> Result<String, TranscriptError> {
        // Operates on whatever page the backend currently renders; the id
        // and language were fixed when that page was opened.
        self.extractor.extract().await
    }
}

/// Orchestrates transcript extraction: resolve the video id, then try each
/// strategy in order until one succeeds.
///
/// Nothing is cached; two calls for the same video perform two full fetch
/// sequences.
pub struct TranscriptService {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl TranscriptService {
    /// Structured path only. This is what the CLI uses, where no live page
    /// exists to fall back to.
    pub fn new(client: Client) -> Self {
        Self::from_strategies(vec![Box::new(StructuredStrategy::new(client))])
    }

    /// Structured path with the DOM fallback behind it.
    pub fn with_dom_fallback(client: Client, dom: Arc<dyn PageDom>) -> Self {
        Self::from_strategies(vec![
            Box::new(StructuredStrategy::new(client)),
            Box::new(DomFallbackStrategy::new(dom)),
        ])
    }

    /// Explicit strategy list, tried in order.
    pub fn from_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Produce one transcript string for a watch-page URL or bare video id.
    ///
    /// Earlier strategy failures are logged for diagnostics only; the error
    /// surfaced to the caller is always the last strategy's.
    pub async fn extract(
        &self,
        location_or_id: &str,
        preferred_lang: Option<&str>,
    ) -> Result<String, TranscriptError> {
        let video_id = video::resolve(location_or_id)?;

        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.extract(&video_id, preferred_lang).await {
                Ok(transcript) => {
                    tracing::info!(
                        video_id = %video_id,
                        strategy = strategy.name(),
                        "transcript extracted"
                    );
                    return Ok(transcript);
                }
                Err(err) => {
                    tracing::warn!(
                        video_id = %video_id,
                        strategy = strategy.name(),
                        error = %err,
                        "extraction strategy failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(TranscriptError::TranscriptNotAvailable))
    }
}

/// Serializable result of one extraction call.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExtractionOutcome {
    #[serde(rename_all = "camelCase")]
    Success { transcript: String },
    #[serde(rename_all = "camelCase")]
    Failure {
        kind: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        video_id: Option<VideoId>,
    },
}

impl From<Result<String, TranscriptError>> for ExtractionOutcome {
    fn from(result: Result<String, TranscriptError>) -> Self {
        match result {
            Ok(transcript) => Self::Success { transcript },
            Err(err) => Self::Failure {
                kind: err.kind().to_string(),
                message: err.to_string(),
                video_id: err.video_id().cloned(),
            },
        }
    }
}

/// Inbound message shape, answered asynchronously by [`RequestHandler`].
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "extractTranscript", rename_all = "camelCase")]
    ExtractTranscript {
        url: String,
        #[serde(default)]
        lang: Option<String>,
    },
    #[serde(rename = "formatTranscript", rename_all = "camelCase")]
    FormatTranscript {
        transcript: String,
        api_key: String,
        format_instructions: String,
        #[serde(default)]
        model: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Extracted { success: bool, transcript: String },
    #[serde(rename_all = "camelCase")]
    Formatted { success: bool, formatted_text: String },
    #[serde(rename_all = "camelCase")]
    Error { success: bool, error: String },
}

impl Response {
    fn extracted(transcript: String) -> Self {
        Self::Extracted { success: true, transcript }
    }

    fn formatted(formatted_text: String) -> Self {
        Self::Formatted { success: true, formatted_text }
    }

    fn error(error: String) -> Self {
        Self::Error { success: false, error }
    }
}

/// Answers [`Request`]s with [`Response`]s; the transport is up to the
/// embedder.
pub struct RequestHandler {
    service: TranscriptService,
    formatter: TranscriptFormatter,
}

impl RequestHandler {
    pub fn new(service: TranscriptService, formatter: TranscriptFormatter) -> Self {
        Self { service, formatter }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::ExtractTranscript { url, lang } => {
                let lang = lang.as_deref().unwrap_or(DEFAULT_LANGUAGE);
                match self.service.extract(&url, Some(lang)).await {
                    Ok(transcript) => Response::extracted(transcript),
                    Err(err) => Response::error(err.to_string()),
                }
            }
            Request::FormatTranscript {
                transcript,
                api_key,
                format_instructions,
                model,
            } => {
                match self
                    .formatter
                    .format(&transcript, &api_key, &format_instructions, model.as_deref())
                    .await
                {
                    Ok(formatted) => Response::formatted(formatted),
                    Err(err) => Response::error(err.to_string()),
                }
            }
        }
    }
}
