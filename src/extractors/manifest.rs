use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT as USER_AGENT_HEADER};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::USER_AGENT;
use crate::{TranscriptError, VideoId};

/// A single language's pointer to a fetchable timed-text resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub fetch_url: String,
}

/// Turns raw watch-page markup into a parsed caption manifest, or a
/// classified failure.
///
/// The host provides no API for this, so the default implementation scrapes
/// an embedded JSON blob out of whatever markup shape is currently served.
/// Putting that brittle contract behind a trait keeps callers untouched when
/// the heuristic has to change.
pub trait ManifestExtractor: Send + Sync {
    fn extract(
        &self,
        page_body: &str,
        video_id: &VideoId,
    ) -> Result<Vec<CaptionTrack>, TranscriptError>;
}

const CAPTIONS_MARKER: &str = "\"captions\":";
const MANIFEST_END_MARKER: &str = ",\"videoDetails";
const CAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const PLAYABILITY_MARKER: &str = "\"playabilityStatus\":";

// Shape of the embedded blob between the two markers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsBlob {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<RawCaptionTrack>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    language_code: String,
}

/// Default [`ManifestExtractor`]: scan for the `"captions":` marker and parse
/// the substring up to `,"videoDetails` as JSON.
#[derive(Debug, Default)]
pub struct MarkerManifestExtractor;

impl ManifestExtractor for MarkerManifestExtractor {
    fn extract(
        &self,
        page_body: &str,
        video_id: &VideoId,
    ) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let Some(start) = page_body.find(CAPTIONS_MARKER) else {
            // Classify why the marker is missing, most specific first.
            if page_body.contains(CAPTCHA_MARKER) {
                return Err(TranscriptError::TooManyRequests);
            }
            if !page_body.contains(PLAYABILITY_MARKER) {
                return Err(TranscriptError::VideoUnavailable(video_id.clone()));
            }
            return Err(TranscriptError::CaptionsDisabled(video_id.clone()));
        };

        let tail = &page_body[start + CAPTIONS_MARKER.len()..];
        let raw_json = tail
            .split(MANIFEST_END_MARKER)
            .next()
            .unwrap_or(tail)
            .replacen('\n', "", 1);

        let renderer = serde_json::from_str::<CaptionsBlob>(&raw_json)
            .ok()
            .and_then(|blob| blob.player_captions_tracklist_renderer)
            .ok_or_else(|| TranscriptError::CaptionsDisabled(video_id.clone()))?;

        let raw_tracks = renderer
            .caption_tracks
            .filter(|tracks| !tracks.is_empty())
            .ok_or_else(|| TranscriptError::NoTranscriptAvailable(video_id.clone()))?;

        // A manifest is unique by language code; first occurrence wins.
        let mut tracks: Vec<CaptionTrack> = Vec::with_capacity(raw_tracks.len());
        for raw in raw_tracks {
            if tracks.iter().any(|t| t.language_code == raw.language_code) {
                continue;
            }
            tracks.push(CaptionTrack {
                language_code: raw.language_code,
                fetch_url: raw.base_url,
            });
        }

        Ok(tracks)
    }
}

/// Fail with [`TranscriptError::LanguageNotAvailable`] when no track matches
/// the requested language.
pub fn ensure_language(tracks: &[CaptionTrack], lang: &str) -> Result<(), TranscriptError> {
    if tracks.iter().any(|t| t.language_code == lang) {
        Ok(())
    } else {
        Err(TranscriptError::LanguageNotAvailable {
            lang: lang.to_string(),
            available: tracks.iter().map(|t| t.language_code.clone()).collect(),
        })
    }
}

/// The track the service should fetch: the preferred language's track, or the
/// first track when no language was requested.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    preferred_lang: Option<&str>,
) -> Option<&'a CaptionTrack> {
    match preferred_lang {
        Some(lang) => tracks.iter().find(|t| t.language_code == lang),
        None => tracks.first(),
    }
}

/// Retrieves the watch page and extracts the caption-track manifest.
pub struct CaptionManifestFetcher {
    client: Client,
    extractor: Box<dyn ManifestExtractor>,
}

impl CaptionManifestFetcher {
    pub fn new(client: Client) -> Self {
        Self::with_extractor(client, Box::new(MarkerManifestExtractor))
    }

    pub fn with_extractor(client: Client, extractor: Box<dyn ManifestExtractor>) -> Self {
        Self { client, extractor }
    }

    /// Fetch the ordered caption-track manifest for a video.
    ///
    /// When `preferred_lang` is given it is also sent as `Accept-Language`
    /// and must be present in the manifest.
    pub async fn fetch_manifest(
        &self,
        video_id: &VideoId,
        preferred_lang: Option<&str>,
    ) -> Result<Vec<CaptionTrack>, TranscriptError> {
        tracing::debug!(video_id = %video_id, "fetching watch page");

        let mut request = self
            .client
            .get(video_id.watch_url())
            .header(USER_AGENT_HEADER, USER_AGENT);
        if let Some(lang) = preferred_lang {
            request = request.header(ACCEPT_LANGUAGE, lang);
        }

        let body = request.send().await?.text().await?;
        let tracks = self.extractor.extract(&body, video_id)?;

        if let Some(lang) = preferred_lang {
            ensure_language(&tracks, lang)?;
        }

        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_id() -> VideoId {
        VideoId::new("dQw4w9WgXcQ").unwrap()
    }

    fn page_with_tracks(tracks_json: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"playabilityStatus":{{"status":"OK"}},"captions":{{"playerCaptionsTracklistRenderer":{tracks_json}}},"videoDetails":{{"videoId":"dQw4w9WgXcQ"}}}};</script></html>"#
        )
    }

    fn two_track_page() -> String {
        page_with_tracks(
            r#"{"captionTracks":[{"baseUrl":"https://example.com/t1","languageCode":"en"},{"baseUrl":"https://example.com/t2","languageCode":"es"}]}"#,
        )
    }

    #[test]
    fn parses_ordered_track_list() {
        let tracks = MarkerManifestExtractor
            .extract(&two_track_page(), &video_id())
            .unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "en");
        assert_eq!(tracks[0].fetch_url, "https://example.com/t1");
        assert_eq!(tracks[1].language_code, "es");
    }

    #[test]
    fn duplicate_language_codes_keep_first_occurrence() {
        let page = page_with_tracks(
            r#"{"captionTracks":[{"baseUrl":"https://example.com/a","languageCode":"en"},{"baseUrl":"https://example.com/b","languageCode":"en"}]}"#,
        );
        let tracks = MarkerManifestExtractor.extract(&page, &video_id()).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].fetch_url, "https://example.com/a");
    }

    #[test]
    fn captcha_page_is_too_many_requests() {
        // CAPTCHA wins over the missing-playability check.
        let page = r#"<html><div class="g-recaptcha"></div></html>"#;
        assert!(matches!(
            MarkerManifestExtractor.extract(page, &video_id()),
            Err(TranscriptError::TooManyRequests)
        ));
    }

    #[test]
    fn page_without_playability_status_is_video_unavailable() {
        let page = "<html><body>nothing here</body></html>";
        assert!(matches!(
            MarkerManifestExtractor.extract(page, &video_id()),
            Err(TranscriptError::VideoUnavailable(_))
        ));
    }

    #[test]
    fn playable_page_without_captions_marker_is_captions_disabled() {
        let page = r#"<html><script>{"playabilityStatus":{"status":"OK"}}</script></html>"#;
        assert!(matches!(
            MarkerManifestExtractor.extract(page, &video_id()),
            Err(TranscriptError::CaptionsDisabled(_))
        ));
    }

    #[test]
    fn unparsable_blob_is_captions_disabled() {
        let page = r#"<html>"playabilityStatus":{},"captions":{{{not json,"videoDetails"</html>"#;
        assert!(matches!(
            MarkerManifestExtractor.extract(page, &video_id()),
            Err(TranscriptError::CaptionsDisabled(_))
        ));
    }

    #[test]
    fn renderer_without_tracks_is_no_transcript_available() {
        let page = page_with_tracks(r#"{"audioTracks":[]}"#);
        assert!(matches!(
            MarkerManifestExtractor.extract(&page, &video_id()),
            Err(TranscriptError::NoTranscriptAvailable(_))
        ));

        let page = page_with_tracks(r#"{"captionTracks":[]}"#);
        assert!(matches!(
            MarkerManifestExtractor.extract(&page, &video_id()),
            Err(TranscriptError::NoTranscriptAvailable(_))
        ));
    }

    #[test]
    fn select_track_prefers_requested_language() {
        let tracks = MarkerManifestExtractor
            .extract(&two_track_page(), &video_id())
            .unwrap();
        assert_eq!(
            select_track(&tracks, Some("es")).unwrap().fetch_url,
            "https://example.com/t2"
        );
        assert_eq!(
            select_track(&tracks, None).unwrap().fetch_url,
            "https://example.com/t1"
        );
    }

    #[test]
    fn missing_language_lists_available_ones() {
        let tracks = MarkerManifestExtractor
            .extract(&two_track_page(), &video_id())
            .unwrap();
        match ensure_language(&tracks, "fr") {
            Err(TranscriptError::LanguageNotAvailable { lang, available }) => {
                assert_eq!(lang, "fr");
                assert_eq!(available, vec!["en".to_string(), "es".to_string()]);
            }
            other => panic!("expected LanguageNotAvailable, got {other:?}"),
        }
    }
}
