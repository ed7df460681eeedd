use super::{SearchResults, SearchSnapshot, SearchStatus};
use crate::error::{GatewayError, SearchError};
use crate::gateway::{GatewayResponse, RequestGateway, path_with_query};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct PendingTimer {
    id: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct PipelineState {
    /// Highest query token handed out so far.
    issued: u64,
    timer: Option<PendingTimer>,
    next_timer_id: u64,
}

struct Inner {
    gateway: Arc<dyn RequestGateway>,
    debounce: Duration,
    state: Mutex<PipelineState>,
    snapshot: watch::Sender<SearchSnapshot>,
}

/// Turns query input into results.
///
/// Each input restarts a debounce timer. When a timer fires the request gets
/// the next query token, and a response is committed only while its token is
/// still the highest one issued. Superseded timers are aborted; superseded
/// requests run to completion and their results are dropped.
///
/// `query_text` always names the query whose token is current, so a reader
/// never sees typed-but-unissued text next to results of an older query.
#[derive(Clone)]
pub struct SearchPipeline {
    inner: Arc<Inner>,
}

impl SearchPipeline {
    pub fn new(gateway: Arc<dyn RequestGateway>, debounce: Duration) -> Self {
        let (snapshot, _) = watch::channel(SearchSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                debounce,
                state: Mutex::new(PipelineState::default()),
                snapshot,
            }),
        }
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Record a keystroke. Blank input clears the pipeline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn input(&self, text: &str) {
        let query = text.trim().to_string();
        if query.is_empty() {
            self.clear();
            return;
        }

        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
        }
        state.next_timer_id += 1;
        let id = state.next_timer_id;

        let pipeline = self.clone();
        let delay = self.inner.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(token) = pipeline.claim_timer(id, &query) {
                pipeline.run(token, &query).await;
            }
        });
        state.timer = Some(PendingTimer { id, handle });
        tracing::trace!(timer = id, "search debounce scheduled");
    }

    /// Issue `text` immediately, skipping the debounce, and return the
    /// snapshot once this request has settled.
    pub async fn search_now(&self, text: &str) -> SearchSnapshot {
        let query = text.trim().to_string();
        if query.is_empty() {
            self.clear();
            return self.snapshot();
        }
        let token = {
            let mut state = self.lock();
            if let Some(timer) = state.timer.take() {
                timer.handle.abort();
            }
            self.issue(&mut state, &query)
        };
        self.run(token, &query).await;
        self.snapshot()
    }

    /// Cancel any pending timer, invalidate in-flight requests and return to
    /// an empty idle state.
    pub fn clear(&self) {
        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
        }
        state.issued += 1;
        self.inner.snapshot.send_replace(SearchSnapshot {
            query_token: state.issued,
            ..SearchSnapshot::default()
        });
        tracing::debug!(token = state.issued, "search cleared");
    }

    /// Claim the timer slot for a firing timer and issue its query under the
    /// same lock. `None` when a newer input or a clear replaced it.
    fn claim_timer(&self, id: u64, query: &str) -> Option<u64> {
        let mut state = self.lock();
        if !state.timer.as_ref().is_some_and(|timer| timer.id == id) {
            return None;
        }
        // Dropping the handle detaches the task, so later input can no
        // longer abort the request it is about to issue.
        state.timer = None;
        Some(self.issue(&mut state, query))
    }

    /// Hand out the next token and mark `query` pending. Caller holds the
    /// state lock.
    fn issue(&self, state: &mut PipelineState, query: &str) -> u64 {
        state.issued += 1;
        let token = state.issued;
        self.inner.snapshot.send_modify(|snap| {
            snap.query_token = token;
            query.clone_into(&mut snap.query_text);
            snap.status = SearchStatus::Pending;
            snap.last_error = None;
        });
        tracing::debug!(token, query, "search issued");
        token
    }

    async fn run(&self, token: u64, query: &str) {
        let outcome = self
            .inner
            .gateway
            .get(&path_with_query("/search", "query", query))
            .await
            .and_then(GatewayResponse::into_result)
            .and_then(|resp| resp.json::<SearchResults>());

        self.settle(token, outcome);
    }

    fn settle(&self, token: u64, outcome: Result<SearchResults, GatewayError>) {
        let state = self.lock();
        if token != state.issued {
            tracing::debug!(token, latest = state.issued, "discarding stale search response");
            return;
        }

        match outcome {
            Ok(results) => {
                tracing::debug!(
                    token,
                    posts = results.posts.len(),
                    users = results.users.len(),
                    "search results committed"
                );
                self.inner.snapshot.send_modify(|snap| {
                    snap.results = results;
                    snap.status = SearchStatus::Done;
                });
            }
            Err(err) => {
                tracing::warn!(token, error = %err, "search request failed");
                let err = SearchError::Transport(err.to_string());
                self.inner.snapshot.send_modify(|snap| {
                    snap.results = SearchResults::default();
                    snap.status = SearchStatus::Idle;
                    snap.last_error = Some(err.to_string());
                });
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SearchPipeline")
            .field("debounce", &self.inner.debounce)
            .field("issued", &state.issued)
            .field("timer_pending", &state.timer.is_some())
            .finish_non_exhaustive()
    }
}
