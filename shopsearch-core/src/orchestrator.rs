//! Search-mode orchestration for one search surface.
//!
//! `SearchOrchestrator` owns the query text, the selected image and its
//! preview handle, and the `SearchState` the result area renders. It never
//! performs I/O itself: each submission is split into a synchronous `begin_*`
//! step, which validates input and moves to `Loading`, and `complete`, which
//! reconciles the transport's outcome. Every submission takes a new
//! generation; `complete` only applies an outcome whose generation is still
//! current, so a newer submission, `clear`, or dropping the orchestrator
//! silently supersedes an older in-flight request.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::transport::TransportError;
use crate::types::{ProductResult, SearchMode, SearchPhase, SearchState, SelectedFile};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a search term";
pub const NO_FILE_MESSAGE: &str = "Please select an image";

/// Errors surfaced by a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Input was rejected before any request was sent.
    Validation(String),
    /// The request was sent and failed.
    Transport(TransportError),
}

impl SearchError {
    /// Return a user-facing message.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(msg) => msg,
            Self::Transport(e) => e.message(),
        }
    }
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::Transport(e) => write!(f, "Error during search: {}", e.message()),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<TransportError> for SearchError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Identifies one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// The request the caller must hand to the transport.
#[derive(Debug, Clone)]
pub enum SearchRequest {
    Text(String),
    Image { file: Arc<SelectedFile>, top_k: usize },
}

/// A submission that has moved the surface to `Loading` and now waits for
/// its transport outcome.
#[derive(Debug)]
pub struct PendingSearch {
    pub ticket: Ticket,
    pub request: SearchRequest,
}

/// Result of feeding an outcome back through `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outcome was current and the state now shows it.
    Applied(SearchPhase),
    /// A newer submission or a clear superseded the request.
    Discarded,
}

/// The selected image and the preview that displays it.
struct Selection {
    file: Arc<SelectedFile>,
    preview: PreviewHandle,
}

pub struct SearchOrchestrator {
    state: SearchState,
    query_text: String,
    selection: Option<Selection>,
    generation: u64,
    in_flight: Option<Ticket>,
    top_k: usize,
    auto_search: bool,
    previews: PreviewRegistry,
}

impl SearchOrchestrator {
    pub fn new(config: &SearchConfig, previews: PreviewRegistry) -> Self {
        Self {
            state: SearchState::default(),
            query_text: String::new(),
            selection: None,
            generation: 0,
            in_flight: None,
            top_k: config.top_k,
            auto_search: config.auto_search,
            previews,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Record what the user has typed so far without searching.
    pub fn set_query_text(&mut self, text: &str) {
        self.query_text = text.to_string();
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selection.as_ref().map(|s| s.file.as_ref())
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.preview.url())
    }

    pub fn auto_search(&self) -> bool {
        self.auto_search
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Whether a request is outstanding whose outcome would still be applied.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a text search. A blank query is rejected without touching state.
    pub fn begin_text_search(&mut self, query: &str) -> Result<PendingSearch, SearchError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(SearchError::Validation(EMPTY_QUERY_MESSAGE.to_string()));
        }
        self.query_text = query.to_string();
        self.release_selection();
        Ok(self.start(SearchMode::Text, SearchRequest::Text(trimmed.to_string())))
    }

    /// Replace the selected image. `None` is a no-op.
    ///
    /// The previous preview is revoked and previous results are dropped. With
    /// auto-search on, the image search starts immediately and its pending
    /// request is returned; otherwise the surface idles until
    /// `begin_image_search`.
    pub fn select_file(&mut self, file: Option<SelectedFile>) -> Option<PendingSearch> {
        let file = Arc::new(file?);
        self.release_selection();

        let preview = self.previews.acquire(Arc::clone(&file));
        log::debug!("selected {} as {}", file.name, preview.url());
        self.selection = Some(Selection { file, preview });

        self.invalidate();
        self.state = SearchState::default();

        if !self.auto_search {
            return None;
        }
        self.begin_image_search().ok()
    }

    /// Start an image search with the selected file.
    pub fn begin_image_search(&mut self) -> Result<PendingSearch, SearchError> {
        let file = self
            .selection
            .as_ref()
            .map(|s| Arc::clone(&s.file))
            .ok_or_else(|| SearchError::Validation(NO_FILE_MESSAGE.to_string()))?;
        let top_k = self.top_k;
        Ok(self.start(SearchMode::Image, SearchRequest::Image { file, top_k }))
    }

    /// Reconcile a transport outcome. Outcomes for superseded tickets are
    /// discarded without touching state.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<Vec<ProductResult>, TransportError>,
    ) -> Completion {
        if self.in_flight != Some(ticket) {
            log::debug!("discarding stale response for {ticket:?}");
            return Completion::Discarded;
        }
        self.in_flight = None;

        match outcome {
            Ok(results) if results.is_empty() => {
                self.state.phase = SearchPhase::Empty;
                self.state.results = results;
            }
            Ok(results) => {
                log::info!("{} result(s) for {:?} search", results.len(), self.state.mode);
                self.state.phase = SearchPhase::Success;
                self.state.results = results;
            }
            Err(e) => {
                log::warn!("{:?} search failed: {e}", self.state.mode);
                self.state.phase = SearchPhase::Error;
                self.state.results = Vec::new();
                self.state.error_message = Some(e.message().to_string());
            }
        }
        Completion::Applied(self.state.phase)
    }

    /// Give up on a request whose outcome will never arrive. If `ticket` is
    /// still current the surface returns to `Idle`, keeping the query text and
    /// the selected image; otherwise nothing changes.
    pub fn abandon(&mut self, ticket: Ticket) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }
        log::info!("{:?} search abandoned before completion", self.state.mode);
        self.in_flight = None;
        self.state = SearchState::default();
        true
    }

    /// Back to the initial state. Safe to call at any time.
    pub fn clear(&mut self) {
        self.release_selection();
        self.query_text.clear();
        self.invalidate();
        self.state = SearchState::default();
    }

    fn start(&mut self, mode: SearchMode, request: SearchRequest) -> PendingSearch {
        self.generation += 1;
        let ticket = Ticket(self.generation);
        self.in_flight = Some(ticket);
        self.state = SearchState {
            mode,
            phase: SearchPhase::Loading,
            results: Vec::new(),
            error_message: None,
        };
        PendingSearch { ticket, request }
    }

    fn invalidate(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            log::debug!("superseding in-flight {ticket:?}");
        }
    }

    fn release_selection(&mut self) {
        if let Some(selection) = self.selection.take() {
            log::debug!("releasing preview {}", selection.preview.url());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{photo, product, ranked_products};

    fn orchestrator(auto_search: bool) -> (SearchOrchestrator, PreviewRegistry) {
        let previews = PreviewRegistry::new();
        let config = SearchConfig {
            top_k: 12,
            auto_search,
        };
        (SearchOrchestrator::new(&config, previews.clone()), previews)
    }

    fn assert_cleared(orch: &SearchOrchestrator) {
        assert_eq!(orch.state(), &SearchState::default());
        assert!(orch.selected_file().is_none());
        assert!(orch.preview_url().is_none());
        assert_eq!(orch.query_text(), "");
        assert!(!orch.is_busy());
    }

    #[test]
    fn initial_state_is_idle() {
        let (orch, _) = orchestrator(true);
        assert_cleared(&orch);
    }

    #[test]
    fn blank_text_is_rejected_without_state_change() {
        let (mut orch, _) = orchestrator(true);
        let pending = orch.begin_text_search("shoes").unwrap();
        orch.complete(pending.ticket, Ok(vec![product(1, "Shoes #1")]));
        let before = orch.state().clone();

        for blank in ["", "   ", "\t\n"] {
            let err = orch.begin_text_search(blank).unwrap_err();
            assert_eq!(err, SearchError::Validation(EMPTY_QUERY_MESSAGE.into()));
        }
        assert_eq!(orch.state(), &before);
        assert!(!orch.is_busy());
    }

    #[test]
    fn text_search_sends_trimmed_query_and_enters_loading() {
        let (mut orch, _) = orchestrator(true);
        let pending = orch.begin_text_search("  red shoes ").unwrap();

        assert!(matches!(&pending.request, SearchRequest::Text(q) if q == "red shoes"));
        assert_eq!(orch.state().mode, SearchMode::Text);
        assert_eq!(orch.state().phase, SearchPhase::Loading);
        assert!(orch.state().results.is_empty());
        assert!(orch.is_busy());
    }

    #[test]
    fn text_success_shows_results_in_order() {
        let (mut orch, _) = orchestrator(true);
        let results = vec![product(3, "C"), product(1, "A"), product(2, "B")];
        let pending = orch.begin_text_search("red shoes").unwrap();

        let completion = orch.complete(pending.ticket, Ok(results.clone()));

        assert_eq!(completion, Completion::Applied(SearchPhase::Success));
        assert_eq!(
            orch.state(),
            &SearchState {
                mode: SearchMode::Text,
                phase: SearchPhase::Success,
                results,
                error_message: None,
            }
        );
    }

    #[test]
    fn empty_result_is_empty_phase_not_error() {
        let (mut orch, _) = orchestrator(true);
        let pending = orch.begin_text_search("unicorn").unwrap();

        assert_eq!(
            orch.complete(pending.ticket, Ok(Vec::new())),
            Completion::Applied(SearchPhase::Empty)
        );
        assert_eq!(orch.state().phase, SearchPhase::Empty);
        assert!(orch.state().error_message.is_none());
    }

    #[test]
    fn transport_failure_sets_error_message() {
        let (mut orch, _) = orchestrator(true);
        let pending = orch.begin_text_search("shoes").unwrap();

        orch.complete(
            pending.ticket,
            Err(TransportError::Network("connection refused".into())),
        );

        assert_eq!(orch.state().phase, SearchPhase::Error);
        assert_eq!(orch.state().error_message.as_deref(), Some("connection refused"));
        assert!(orch.state().results.is_empty());
        assert!(!orch.is_busy());
    }

    #[test]
    fn image_search_without_file_is_rejected() {
        let (mut orch, _) = orchestrator(false);
        let err = orch.begin_image_search().unwrap_err();
        assert_eq!(err.user_message(), NO_FILE_MESSAGE);
        assert_eq!(orch.state().phase, SearchPhase::Idle);
    }

    #[test]
    fn select_none_is_a_noop() {
        let (mut orch, previews) = orchestrator(true);
        assert!(orch.select_file(None).is_none());
        assert_cleared(&orch);
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn auto_search_starts_image_search_on_select() {
        let (mut orch, previews) = orchestrator(true);
        let pending = orch.select_file(Some(photo("photo.jpg"))).unwrap();

        match &pending.request {
            SearchRequest::Image { file, top_k } => {
                assert_eq!(file.name, "photo.jpg");
                assert_eq!(*top_k, 12);
            }
            other => panic!("expected image request, got {other:?}"),
        }
        assert_eq!(orch.state().mode, SearchMode::Image);
        assert_eq!(orch.state().phase, SearchPhase::Loading);
        assert!(previews.is_live(orch.preview_url().unwrap()));

        orch.complete(pending.ticket, Ok(ranked_products(12)));
        assert_eq!(orch.state().phase, SearchPhase::Success);
        assert_eq!(orch.state().results.len(), 12);
    }

    #[test]
    fn manual_mode_waits_for_explicit_submit() {
        let (mut orch, _) = orchestrator(false);
        assert!(orch.select_file(Some(photo("photo.jpg"))).is_none());
        assert_eq!(orch.state().phase, SearchPhase::Idle);
        assert_eq!(orch.state().mode, SearchMode::None);
        assert!(orch.preview_url().is_some());

        let pending = orch.begin_image_search().unwrap();
        assert_eq!(orch.state().mode, SearchMode::Image);
        orch.complete(pending.ticket, Ok(ranked_products(3)));
        assert_eq!(orch.state().results.len(), 3);
    }

    #[test]
    fn selecting_a_file_clears_previous_results() {
        let (mut orch, _) = orchestrator(false);
        let pending = orch.begin_text_search("shoes").unwrap();
        orch.complete(pending.ticket, Ok(vec![product(1, "A")]));

        orch.select_file(Some(photo("photo.jpg")));

        assert!(orch.state().results.is_empty());
        assert_eq!(orch.state().phase, SearchPhase::Idle);
    }

    #[test]
    fn new_file_releases_old_preview_exactly_once() {
        let (mut orch, previews) = orchestrator(false);
        orch.select_file(Some(photo("first.jpg")));
        let first_url = orch.preview_url().unwrap().to_string();

        orch.select_file(Some(photo("second.jpg")));
        let second_url = orch.preview_url().unwrap().to_string();

        assert_ne!(first_url, second_url);
        assert_eq!(previews.revocations(&first_url), 1);
        assert!(!previews.is_live(&first_url));
        assert!(previews.is_live(&second_url));
        assert_eq!(previews.live_count(), 1);

        orch.clear();
        orch.clear();
        assert_eq!(previews.revocations(&first_url), 1);
        assert_eq!(previews.revocations(&second_url), 1);
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn text_search_releases_selected_image() {
        let (mut orch, previews) = orchestrator(false);
        orch.select_file(Some(photo("photo.jpg")));
        let url = orch.preview_url().unwrap().to_string();

        orch.begin_text_search("bags").unwrap();

        assert!(orch.selected_file().is_none());
        assert_eq!(previews.revocations(&url), 1);
    }

    #[test]
    fn clear_from_every_phase_resets_state() {
        let outcomes: Vec<Option<Result<Vec<ProductResult>, TransportError>>> = vec![
            None,
            Some(Ok(vec![product(1, "A")])),
            Some(Ok(Vec::new())),
            Some(Err(TransportError::Rejected("search failed".into()))),
        ];

        for outcome in outcomes {
            let (mut orch, previews) = orchestrator(true);
            let pending = orch.select_file(Some(photo("photo.jpg"))).unwrap();
            if let Some(outcome) = outcome {
                orch.complete(pending.ticket, outcome);
            }
            orch.set_query_text("half typed");

            orch.clear();
            assert_cleared(&orch);
            orch.clear();
            assert_cleared(&orch);
            assert_eq!(previews.live_count(), 0);
        }
    }

    #[test]
    fn clear_on_fresh_orchestrator_is_safe() {
        let (mut orch, _) = orchestrator(true);
        orch.clear();
        assert_cleared(&orch);
    }

    #[test]
    fn newer_submission_discards_older_response() {
        let (mut orch, _) = orchestrator(true);
        let text = orch.begin_text_search("slow query").unwrap();
        let image = orch.select_file(Some(photo("photo.jpg"))).unwrap();

        assert_eq!(
            orch.complete(image.ticket, Ok(ranked_products(12))),
            Completion::Applied(SearchPhase::Success)
        );
        assert_eq!(
            orch.complete(text.ticket, Ok(vec![product(99, "stale")])),
            Completion::Discarded
        );

        assert_eq!(orch.state().mode, SearchMode::Image);
        assert_eq!(orch.state().results.len(), 12);
        assert!(orch.state().results.iter().all(|p| p.similarity.is_some()));
    }

    #[test]
    fn clear_discards_in_flight_response() {
        let (mut orch, _) = orchestrator(true);
        let pending = orch.begin_text_search("shoes").unwrap();
        orch.clear();

        assert_eq!(
            orch.complete(pending.ticket, Ok(vec![product(1, "A")])),
            Completion::Discarded
        );
        assert_cleared(&orch);
    }

    #[test]
    fn error_then_retry_succeeds() {
        let (mut orch, _) = orchestrator(true);
        let first = orch.select_file(Some(photo("photo.jpg"))).unwrap();
        orch.complete(
            first.ticket,
            Err(TransportError::Status {
                status: 500,
                message: "Failed to extract features".into(),
            }),
        );
        assert_eq!(orch.state().phase, SearchPhase::Error);

        let retry = orch.begin_image_search().unwrap();
        assert!(orch.state().error_message.is_none());
        orch.complete(retry.ticket, Ok(ranked_products(2)));
        assert_eq!(orch.state().phase, SearchPhase::Success);
    }

    #[test]
    fn drop_releases_preview() {
        let (mut orch, previews) = orchestrator(false);
        orch.select_file(Some(photo("photo.jpg")));
        let url = orch.preview_url().unwrap().to_string();

        drop(orch);

        assert_eq!(previews.revocations(&url), 1);
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn abandoned_request_returns_to_idle() {
        let (mut orch, _) = orchestrator(false);
        orch.select_file(Some(photo("photo.jpg")));
        let pending = orch.begin_image_search().unwrap();

        assert!(orch.abandon(pending.ticket));

        assert_eq!(orch.state(), &SearchState::default());
        assert!(!orch.is_busy());
        assert!(orch.preview_url().is_some());
        assert_eq!(
            orch.complete(pending.ticket, Ok(ranked_products(3))),
            Completion::Discarded
        );
    }

    #[test]
    fn abandoning_a_superseded_request_changes_nothing() {
        let (mut orch, _) = orchestrator(true);
        let old = orch.begin_text_search("shoes").unwrap();
        let new = orch.begin_text_search("bags").unwrap();

        assert!(!orch.abandon(old.ticket));

        assert_eq!(orch.state().phase, SearchPhase::Loading);
        assert!(orch.is_busy());
        assert_eq!(
            orch.complete(new.ticket, Ok(vec![product(1, "Bag #1")])),
            Completion::Applied(SearchPhase::Success)
        );
    }
}
