//! Async driver that pairs a `SearchOrchestrator` with a `Transport`.
//!
//! The orchestrator lock is only held for the synchronous begin/complete
//! steps, never across the transport call, so overlapping submissions from
//! different tasks interleave and the newest one wins. A submission whose
//! future is dropped before the transport answers is abandoned, so the
//! surface never stays in `Loading`.

use std::sync::{Mutex, MutexGuard};

use crate::config::SearchConfig;
use crate::orchestrator::{
    Completion, PendingSearch, SearchError, SearchOrchestrator, SearchRequest, Ticket,
};
use crate::preview::PreviewRegistry;
use crate::transport::Transport;
use crate::types::{SearchState, SelectedFile};

pub struct SearchSession<T> {
    transport: T,
    orchestrator: Mutex<SearchOrchestrator>,
}

impl<T: Transport> SearchSession<T> {
    pub fn new(transport: T, config: &SearchConfig, previews: PreviewRegistry) -> Self {
        Self {
            transport,
            orchestrator: Mutex::new(SearchOrchestrator::new(config, previews)),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the current search state.
    pub fn state(&self) -> SearchState {
        self.lock().state().clone()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.lock().preview_url().map(str::to_string)
    }

    pub fn selected_file_name(&self) -> Option<String> {
        self.lock().selected_file().map(|f| f.name.clone())
    }

    pub fn query_text(&self) -> String {
        self.lock().query_text().to_string()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    pub async fn submit_text(&self, query: &str) -> Result<Completion, SearchError> {
        let pending = self.lock().begin_text_search(query)?;
        self.run(pending).await
    }

    /// Select a file; with auto-search on this also runs the image search.
    pub async fn select_file(
        &self,
        file: Option<SelectedFile>,
    ) -> Result<Option<Completion>, SearchError> {
        let pending = self.lock().select_file(file);
        match pending {
            Some(pending) => self.run(pending).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn submit_image(&self) -> Result<Completion, SearchError> {
        let pending = self.lock().begin_image_search()?;
        self.run(pending).await
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Issue the request and reconcile it. A failure that was superseded
    /// before it arrived is not reported.
    async fn run(&self, pending: PendingSearch) -> Result<Completion, SearchError> {
        let PendingSearch { ticket, request } = pending;
        let guard = AbandonOnDrop {
            orchestrator: &self.orchestrator,
            ticket: Some(ticket),
        };
        let outcome = match &request {
            SearchRequest::Text(query) => self.transport.search_by_text(query).await,
            SearchRequest::Image { file, top_k } => {
                self.transport.search_by_image(file, *top_k).await
            }
        };
        guard.disarm();

        let error = outcome.as_ref().err().cloned();
        let completion = self.lock().complete(ticket, outcome);
        match (completion, error) {
            (Completion::Applied(_), Some(e)) => Err(SearchError::Transport(e)),
            (completion, _) => Ok(completion),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SearchOrchestrator> {
        lock_orchestrator(&self.orchestrator)
    }
}

fn lock_orchestrator(
    orchestrator: &Mutex<SearchOrchestrator>,
) -> MutexGuard<'_, SearchOrchestrator> {
    orchestrator
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Abandons the ticket unless the transport call ran to completion.
struct AbandonOnDrop<'a> {
    orchestrator: &'a Mutex<SearchOrchestrator>,
    ticket: Option<Ticket>,
}

impl AbandonOnDrop<'_> {
    fn disarm(mut self) {
        self.ticket = None;
    }
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            lock_orchestrator(self.orchestrator).abandon(ticket);
        }
    }
}
