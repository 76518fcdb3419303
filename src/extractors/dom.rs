//! Fallback extraction against the live, rendered watch page.
//!
//! Used when the structured path (embedded manifest + timed text) fails for
//! any reason. The page is reached through the [`PageDom`] seam so the probe
//! cascade is independent of any particular browser backend; an embedder
//! wires in whatever drives its page (a WebDriver session, an in-process
//! view, ...). Only concatenated text is recoverable on this path, never
//! timing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::join_segments;
use crate::TranscriptError;

/// Fixed settle delay after clicking the transcript control; panel rendering
/// is asynchronous and there is no readiness signal to poll.
pub const PANEL_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Fixed settle delay after opening an overflow or three-dot menu.
pub const MENU_SETTLE_DELAY: Duration = Duration::from_millis(500);

const TRANSCRIPT_NEEDLE: &str = "transcript";

const PANEL_SELECTOR: &str = "ytd-transcript-renderer";

/// Either rendering of an already-open transcript panel.
const OPEN_PANEL_SELECTORS: &[&str] = &[
    "ytd-transcript-renderer",
    r#"ytd-engagement-panel-section-list-renderer[data-panel-identifier="transcript"]"#,
];

const SEGMENT_SELECTOR: &str = "ytd-transcript-segment-renderer";
const SEGMENT_TEXT_SELECTOR: &str = ".segment-text";

/// Opaque reference to one element in the live page. Meaningful only to the
/// [`PageDom`] that produced it, and only for the duration of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Read/query access to a live rendered page, plus the one synthetic click
/// the fallback needs to open a panel or menu.
#[async_trait]
pub trait PageDom: Send + Sync {
    /// First element matching the selector, if any.
    async fn query(&self, selector: &str) -> crate::Result<Option<ElementHandle>>;

    /// All elements matching the selector, in document order.
    async fn query_all(&self, selector: &str) -> crate::Result<Vec<ElementHandle>>;

    /// All elements matching the selector under the given root.
    async fn query_within(
        &self,
        root: ElementHandle,
        selector: &str,
    ) -> crate::Result<Vec<ElementHandle>>;

    /// Rendered text content of an element.
    async fn text_content(&self, element: ElementHandle) -> crate::Result<Option<String>>;

    /// Dispatch a click on an element.
    async fn click(&self, element: ElementHandle) -> crate::Result<()>;
}

/// One attempt at finding the transcript control. The cascade is an ordered,
/// data-driven list so new site-markup variants are a new entry, not new
/// control flow.
enum ProbeKind {
    /// A known button shape, matched directly.
    Selector(&'static str),
    /// Scan matching elements for the needle in their text content.
    TextScan(&'static str),
    /// Click a menu trigger, wait for it to settle, then scan its items.
    OpenMenuThenScan {
        trigger: &'static str,
        items: &'static str,
    },
    /// Scan inside an already-open container.
    ScanWithin {
        container: &'static str,
        items: &'static str,
    },
}

struct ControlProbe {
    description: &'static str,
    kind: ProbeKind,
}

const CONTROL_PROBES: &[ControlProbe] = &[
    ControlProbe {
        description: "show-transcript button",
        kind: ProbeKind::Selector(r#"button[aria-label="Show transcript"]"#),
    },
    ControlProbe {
        description: "player transcript button",
        kind: ProbeKind::Selector(r#"button.ytp-button[aria-label*="transcript"]"#),
    },
    ControlProbe {
        description: "tooltip transcript button",
        kind: ProbeKind::Selector(r#"button[data-tooltip-target-id="transcript"]"#),
    },
    ControlProbe {
        description: "player menu item (lowercase label)",
        kind: ProbeKind::Selector(r#".ytp-menuitem[aria-label*="transcript" i]"#),
    },
    ControlProbe {
        description: "player menu item (capitalized label)",
        kind: ProbeKind::Selector(r#".ytp-menuitem[aria-label*="Transcript" i]"#),
    },
    ControlProbe {
        description: "paper item by label",
        kind: ProbeKind::Selector(r#"tp-yt-paper-item[aria-label*="transcript"]"#),
    },
    ControlProbe {
        description: "formatted string by label",
        kind: ProbeKind::Selector(r#"yt-formatted-string[aria-label*="transcript"]"#),
    },
    ControlProbe {
        description: "menu service items by text",
        kind: ProbeKind::TextScan("ytd-menu-service-item-renderer"),
    },
    ControlProbe {
        description: "paper items by text",
        kind: ProbeKind::TextScan("tp-yt-paper-item"),
    },
    ControlProbe {
        description: "player panel menu items by text",
        kind: ProbeKind::TextScan(r#".ytp-panel-menu [role="menuitem"]"#),
    },
    ControlProbe {
        description: "buttons by text",
        kind: ProbeKind::TextScan("button"),
    },
    ControlProbe {
        description: "player more-options overflow menu",
        kind: ProbeKind::OpenMenuThenScan {
            trigger: "button.ytp-more-button",
            items: r#".ytp-panel-menu [role="menuitem"]"#,
        },
    },
    ControlProbe {
        description: "three-dot panel menu",
        kind: ProbeKind::OpenMenuThenScan {
            trigger: "ytd-menu-renderer yt-icon-button, ytd-menu-renderer #button",
            items: "ytd-menu-service-item-renderer, tp-yt-paper-listbox ytd-menu-service-item-renderer",
        },
    },
    ControlProbe {
        description: "open engagement panel",
        kind: ProbeKind::ScanWithin {
            container: "#engagement-panel-container, ytd-engagement-panel-section-list-renderer",
            items: "button, yt-formatted-string",
        },
    },
];

/// Locates and opens the transcript panel in the live page and scrapes the
/// rendered segments.
pub struct DomFallbackExtractor {
    dom: Arc<dyn PageDom>,
}

impl DomFallbackExtractor {
    pub fn new(dom: Arc<dyn PageDom>) -> Self {
        Self { dom }
    }

    /// Run the full fallback: locate the control, open the panel, scrape.
    pub async fn extract(&self) -> Result<String, TranscriptError> {
        let control = self.locate_control().await?;
        self.open_panel(control).await?;
        self.scrape_segments().await
    }

    async fn locate_control(&self) -> Result<ElementHandle, TranscriptError> {
        for probe in CONTROL_PROBES {
            if let Some(control) = self.run_probe(probe).await? {
                tracing::debug!(probe = probe.description, "located transcript control");
                return Ok(control);
            }
        }
        Err(TranscriptError::TranscriptNotAvailable)
    }

    async fn run_probe(
        &self,
        probe: &ControlProbe,
    ) -> Result<Option<ElementHandle>, TranscriptError> {
        match probe.kind {
            ProbeKind::Selector(selector) => self.dom.query(selector).await.map_err(dom_error),
            ProbeKind::TextScan(selector) => {
                let candidates = self.dom.query_all(selector).await.map_err(dom_error)?;
                self.scan_for_needle(candidates).await
            }
            ProbeKind::OpenMenuThenScan { trigger, items } => {
                let Some(menu) = self.dom.query(trigger).await.map_err(dom_error)? else {
                    return Ok(None);
                };
                self.dom.click(menu).await.map_err(dom_error)?;
                tokio::time::sleep(MENU_SETTLE_DELAY).await;
                let candidates = self.dom.query_all(items).await.map_err(dom_error)?;
                self.scan_for_needle(candidates).await
            }
            ProbeKind::ScanWithin { container, items } => {
                let Some(root) = self.dom.query(container).await.map_err(dom_error)? else {
                    return Ok(None);
                };
                let candidates = self
                    .dom
                    .query_within(root, items)
                    .await
                    .map_err(dom_error)?;
                self.scan_for_needle(candidates).await
            }
        }
    }

    async fn scan_for_needle(
        &self,
        candidates: Vec<ElementHandle>,
    ) -> Result<Option<ElementHandle>, TranscriptError> {
        for candidate in candidates {
            let text = self.dom.text_content(candidate).await.map_err(dom_error)?;
            if let Some(text) = text {
                if text.to_lowercase().contains(TRANSCRIPT_NEEDLE) {
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }

    async fn panel_open(&self) -> Result<bool, TranscriptError> {
        for selector in OPEN_PANEL_SELECTORS {
            if self.dom.query(selector).await.map_err(dom_error)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Click the control unless a panel is already present, then wait the
    /// fixed settle delay. A single unconditional wait, no readiness polling.
    async fn open_panel(&self, control: ElementHandle) -> Result<(), TranscriptError> {
        if self.panel_open().await? {
            return Ok(());
        }
        self.dom.click(control).await.map_err(dom_error)?;
        tokio::time::sleep(PANEL_SETTLE_DELAY).await;
        Ok(())
    }

    async fn scrape_segments(&self) -> Result<String, TranscriptError> {
        let panel = self
            .dom
            .query(PANEL_SELECTOR)
            .await
            .map_err(dom_error)?
            .ok_or(TranscriptError::TranscriptPanelMissing)?;

        let segments = self
            .dom
            .query_within(panel, SEGMENT_SELECTOR)
            .await
            .map_err(dom_error)?;
        if segments.is_empty() {
            return Err(TranscriptError::NoSegmentsFound);
        }

        let mut texts = Vec::with_capacity(segments.len());
        for segment in segments {
            let text_element = self
                .dom
                .query_within(segment, SEGMENT_TEXT_SELECTOR)
                .await
                .map_err(dom_error)?
                .into_iter()
                .next();
            // Segments without a text sub-element are skipped silently.
            let Some(text_element) = text_element else {
                continue;
            };
            if let Some(text) = self
                .dom
                .text_content(text_element)
                .await
                .map_err(dom_error)?
            {
                texts.push(text.trim().to_string());
            }
        }

        Ok(join_segments(texts))
    }
}

fn dom_error(err: anyhow::Error) -> TranscriptError {
    TranscriptError::Unexpected(format!("page backend failure: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Effects a click may have on the fake page.
    enum ClickEffect {
        Reveal { selector: &'static str, handles: Vec<u64> },
        Nothing,
    }

    #[derive(Default)]
    struct FakeState {
        selectors: HashMap<String, Vec<u64>>,
        within: HashMap<(u64, String), Vec<u64>>,
        texts: HashMap<u64, String>,
        click_effects: HashMap<u64, ClickEffect>,
        clicked: Vec<u64>,
    }

    #[derive(Default)]
    struct FakeDom {
        state: Mutex<FakeState>,
    }

    impl FakeDom {
        fn add(&self, selector: &str, handles: &[u64]) {
            self.state
                .lock()
                .unwrap()
                .selectors
                .insert(selector.to_string(), handles.to_vec());
        }

        fn add_within(&self, root: u64, selector: &str, handles: &[u64]) {
            self.state
                .lock()
                .unwrap()
                .within
                .insert((root, selector.to_string()), handles.to_vec());
        }

        fn set_text(&self, handle: u64, text: &str) {
            self.state
                .lock()
                .unwrap()
                .texts
                .insert(handle, text.to_string());
        }

        fn on_click(&self, handle: u64, effect: ClickEffect) {
            self.state
                .lock()
                .unwrap()
                .click_effects
                .insert(handle, effect);
        }

        fn clicked(&self) -> Vec<u64> {
            self.state.lock().unwrap().clicked.clone()
        }

        /// A panel (handle 100) holding segments whose `.segment-text`
        /// children carry the given texts.
        fn add_panel(&self, segment_texts: &[&str]) {
            self.add(PANEL_SELECTOR, &[100]);
            let segments: Vec<u64> = (0..segment_texts.len() as u64).map(|i| 110 + i).collect();
            self.add_within(100, SEGMENT_SELECTOR, &segments);
            for (i, text) in segment_texts.iter().enumerate() {
                let segment = 110 + i as u64;
                let text_el = 210 + i as u64;
                self.add_within(segment, SEGMENT_TEXT_SELECTOR, &[text_el]);
                self.set_text(text_el, text);
            }
        }
    }

    #[async_trait]
    impl PageDom for FakeDom {
        async fn query(&self, selector: &str) -> crate::Result<Option<ElementHandle>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .selectors
                .get(selector)
                .and_then(|h| h.first())
                .copied()
                .map(ElementHandle))
        }

        async fn query_all(&self, selector: &str) -> crate::Result<Vec<ElementHandle>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .selectors
                .get(selector)
                .map(|h| h.iter().copied().map(ElementHandle).collect())
                .unwrap_or_default())
        }

        async fn query_within(
            &self,
            root: ElementHandle,
            selector: &str,
        ) -> crate::Result<Vec<ElementHandle>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .within
                .get(&(root.0, selector.to_string()))
                .map(|h| h.iter().copied().map(ElementHandle).collect())
                .unwrap_or_default())
        }

        async fn text_content(&self, element: ElementHandle) -> crate::Result<Option<String>> {
            Ok(self.state.lock().unwrap().texts.get(&element.0).cloned())
        }

        async fn click(&self, element: ElementHandle) -> crate::Result<()> {
            let mut state = self.state.lock().unwrap();
            state.clicked.push(element.0);
            if let Some(effect) = state.click_effects.remove(&element.0) {
                match effect {
                    ClickEffect::Reveal { selector, handles } => {
                        state.selectors.insert(selector.to_string(), handles);
                    }
                    ClickEffect::Nothing => {}
                }
            }
            Ok(())
        }
    }

    fn extractor(dom: FakeDom) -> (Arc<FakeDom>, DomFallbackExtractor) {
        let dom = Arc::new(dom);
        let extractor = DomFallbackExtractor::new(Arc::clone(&dom) as Arc<dyn PageDom>);
        (dom, extractor)
    }

    #[tokio::test(start_paused = true)]
    async fn direct_selector_click_and_scrape() {
        let dom = FakeDom::default();
        dom.add(r#"button[aria-label="Show transcript"]"#, &[1]);
        // The panel only appears after the control is clicked.
        dom.on_click(
            1,
            ClickEffect::Reveal { selector: PANEL_SELECTOR, handles: vec![100] },
        );
        dom.add_within(100, SEGMENT_SELECTOR, &[110, 111]);
        dom.add_within(110, SEGMENT_TEXT_SELECTOR, &[210]);
        dom.add_within(111, SEGMENT_TEXT_SELECTOR, &[211]);
        dom.set_text(210, "Hi");
        dom.set_text(211, "there");
        let (dom, extractor) = extractor(dom);

        assert_eq!(extractor.extract().await.unwrap(), "Hi there");
        assert_eq!(dom.clicked(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_control_anywhere_is_transcript_not_available() {
        let (_, extractor) = extractor(FakeDom::default());
        assert!(matches!(
            extractor.extract().await,
            Err(TranscriptError::TranscriptNotAvailable)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn text_scan_matches_case_insensitively() {
        let dom = FakeDom::default();
        dom.add("tp-yt-paper-item", &[5, 6]);
        dom.set_text(5, "Settings");
        dom.set_text(6, "Open Transcript");
        let (_, extractor) = extractor(dom);

        assert_eq!(extractor.locate_control().await.unwrap(), ElementHandle(6));
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_menu_is_opened_and_rescanned() {
        let dom = FakeDom::default();
        dom.add("button.ytp-more-button", &[7]);
        dom.on_click(
            7,
            ClickEffect::Reveal {
                selector: r#".ytp-panel-menu [role="menuitem"]"#,
                handles: vec![8, 9],
            },
        );
        dom.set_text(8, "Loop");
        dom.set_text(9, "Show transcript");
        let (dom, extractor) = extractor(dom);

        assert_eq!(extractor.locate_control().await.unwrap(), ElementHandle(9));
        assert_eq!(dom.clicked(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn engagement_panel_is_scanned_without_clicking() {
        let dom = FakeDom::default();
        dom.add(
            "#engagement-panel-container, ytd-engagement-panel-section-list-renderer",
            &[30],
        );
        dom.add_within(30, "button, yt-formatted-string", &[31]);
        dom.set_text(31, "Transcript");
        let (dom, extractor) = extractor(dom);

        assert_eq!(extractor.locate_control().await.unwrap(), ElementHandle(31));
        assert!(dom.clicked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn already_open_panel_is_not_clicked_again() {
        let dom = FakeDom::default();
        dom.add(r#"button[aria-label="Show transcript"]"#, &[1]);
        dom.add_panel(&["solo"]);
        let (dom, extractor) = extractor(dom);

        assert_eq!(extractor.extract().await.unwrap(), "solo");
        assert!(dom.clicked().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn click_that_reveals_nothing_is_panel_missing() {
        let dom = FakeDom::default();
        dom.add(r#"button[aria-label="Show transcript"]"#, &[1]);
        dom.on_click(1, ClickEffect::Nothing);
        let (_, extractor) = extractor(dom);

        assert!(matches!(
            extractor.extract().await,
            Err(TranscriptError::TranscriptPanelMissing)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_panel_is_no_segments_found() {
        let dom = FakeDom::default();
        dom.add(r#"button[aria-label="Show transcript"]"#, &[1]);
        dom.add(PANEL_SELECTOR, &[100]);
        let (_, extractor) = extractor(dom);

        assert!(matches!(
            extractor.extract().await,
            Err(TranscriptError::NoSegmentsFound)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn segments_without_text_element_are_skipped() {
        let dom = FakeDom::default();
        dom.add(r#"button[aria-label="Show transcript"]"#, &[1]);
        dom.add(PANEL_SELECTOR, &[100]);
        dom.add_within(100, SEGMENT_SELECTOR, &[110, 111]);
        // 110 has no .segment-text child at all.
        dom.add_within(111, SEGMENT_TEXT_SELECTOR, &[211]);
        dom.set_text(211, " there ");
        let (_, extractor) = extractor(dom);

        assert_eq!(extractor.extract().await.unwrap(), "there");
    }
}
