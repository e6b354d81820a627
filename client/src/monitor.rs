//! Monitoring view: the list of queries in flight, refreshed on a timer.
//!
//! Activation fetches once right away and then once per interval until the
//! returned [`Poller`] is deactivated or dropped. Every tick runs in its own
//! task with a child cancellation token, so tearing the view down also stops
//! requests that are still in flight. Ticks are numbered and a response older
//! than the last applied one is dropped, a slow poll can never overwrite a
//! newer listing.

use chrono::{DateTime, Utc};
use common::{filter_by_author, Query};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::QueryBackend;
use crate::identity::IdentityStore;
use crate::notify::{self, Component, Notice};

#[derive(Debug, Clone, Default)]
pub struct MonitoringState {
    pub queries: Vec<Query>,
    pub author: String,
    /// Sequence number of the poll whose outcome is currently shown.
    pub applied_seq: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub notice: Option<Notice>,
}

impl MonitoringState {
    pub fn own_queries(&self) -> Vec<&Query> {
        filter_by_author(&self.queries, &self.author)
    }

    fn apply(&mut self, seq: u64, queries: Vec<Query>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.queries = queries;
        self.updated_at = Some(Utc::now());
        self.notice = None;
        true
    }

    /// Keeps the last listing on screen, only the notice changes.
    fn fail(&mut self, seq: u64, notice: Notice) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.notice = Some(notice);
        true
    }
}

pub struct MonitoringView {
    backend: Arc<dyn QueryBackend>,
    identity: Arc<IdentityStore>,
    interval: Duration,
    state: Arc<Mutex<MonitoringState>>,
    updates: Arc<watch::Sender<u64>>,
    /// Last poll number handed out, shared by every activation of the view.
    seq: Arc<AtomicU64>,
}

impl MonitoringView {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        identity: Arc<IdentityStore>,
        interval: Duration,
    ) -> Self {
        let state = MonitoringState {
            author: identity.get_or_create_author_id(),
            ..Default::default()
        };
        let (updates, _) = watch::channel(0);

        Self {
            backend,
            identity,
            interval,
            state: Arc::new(Mutex::new(state)),
            updates: Arc::new(updates),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn current_author(&self) -> String {
        self.identity.get_or_create_author_id()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn snapshot(&self) -> MonitoringState {
        lock(&self.state).clone()
    }

    /// Yields the sequence number of each applied poll outcome.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    pub fn activate(&self) -> Poller {
        let token = CancellationToken::new();
        let ctx = PollContext {
            backend: self.backend.clone(),
            state: self.state.clone(),
            updates: self.updates.clone(),
            seq: self.seq.clone(),
        };

        info!("monitoring activated, polling every {:?}", self.interval);
        let handle = tokio::spawn(poll_loop(ctx, self.interval, token.clone()));

        Poller {
            token,
            handle: Some(handle),
        }
    }
}

/// Running poll loop of an active view.
pub struct Poller {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops the timer and every in-flight poll.
    pub async fn deactivate(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("monitoring deactivated");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Clone)]
struct PollContext {
    backend: Arc<dyn QueryBackend>,
    state: Arc<Mutex<MonitoringState>>,
    updates: Arc<watch::Sender<u64>>,
    seq: Arc<AtomicU64>,
}

async fn poll_loop(ctx: PollContext, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                ticks += 1;
                let seq = ctx.seq.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::spawn(poll_once(ctx.clone(), seq, token.child_token()));
            }
        }
    }
    debug!("poll loop stopped after {} ticks", ticks);
}

async fn poll_once(ctx: PollContext, seq: u64, token: CancellationToken) {
    let result = tokio::select! {
        _ = token.cancelled() => {
            debug!("poll {} cancelled", seq);
            return;
        }
        result = ctx.backend.list_queries() => result,
    };

    let mut state = lock(&ctx.state);
    // The view may have been torn down while the response was decoded.
    if token.is_cancelled() {
        return;
    }

    let applied = match result {
        Ok(queries) => {
            debug!("poll {} returned {} queries", seq, queries.len());
            state.apply(seq, queries)
        }
        Err(err) => state.fail(seq, notify::report(Component::Monitoring, &err)),
    };
    drop(state);

    if applied {
        ctx.updates.send_replace(seq);
    } else {
        debug!("dropping stale poll {}", seq);
    }
}

fn lock(state: &Mutex<MonitoringState>) -> MutexGuard<'_, MonitoringState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, ClientResult};
    use crate::testing::query;
    use async_trait::async_trait;
    use common::{QueryStatus, SearchRequest};
    use std::sync::atomic::AtomicUsize;

    const PERIOD: Duration = Duration::from_millis(3000);

    /// Listing backend: call `n` waits `delays[n]` (if any) and answers with
    /// a single query named after the call, or fails when `failing` is set.
    #[derive(Default)]
    struct Listing {
        calls: AtomicUsize,
        delays: Vec<Duration>,
        failing: bool,
    }

    impl Listing {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryBackend for Listing {
        async fn interpret(&self, _request: &SearchRequest) -> ClientResult<Query> {
            unreachable!("monitoring never interprets")
        }

        async fn start(&self, _query_id: &str) -> ClientResult<()> {
            unreachable!("monitoring never starts queries")
        }

        async fn kill(&self, _query_id: &str) -> ClientResult<()> {
            unreachable!("monitoring never kills queries")
        }

        async fn list_queries(&self) -> ClientResult<Vec<Query>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(n) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing {
                return Err(ClientError::NotFound("query list".into()));
            }
            Ok(vec![query(&format!("call-{n}"), "me", QueryStatus::Running)])
        }

        async fn fetch_result(&self, query_id: &str) -> ClientResult<Query> {
            Err(ClientError::NotFound(query_id.to_string()))
        }
    }

    fn view(backend: Arc<Listing>) -> MonitoringView {
        MonitoringView::new(backend, Arc::new(IdentityStore::in_memory()), PERIOD)
    }

    async fn advance(d: Duration) {
        tokio::time::sleep(d).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_once_per_interval() {
        let backend = Arc::new(Listing::default());
        let view = view(backend.clone());

        let poller = view.activate();
        advance(Duration::from_millis(10)).await;
        assert_eq!(backend.calls(), 1);

        advance(Duration::from_millis(1000)).await;
        assert_eq!(backend.calls(), 1);

        advance(Duration::from_millis(2000)).await;
        assert_eq!(backend.calls(), 2);

        advance(PERIOD * 3).await;
        assert_eq!(backend.calls(), 5);
        assert!(poller.is_active());

        poller.deactivate().await;
        advance(PERIOD * 10).await;
        assert_eq!(backend.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_poller_stops_polling() {
        let backend = Arc::new(Listing::default());
        let view = view(backend.clone());

        let poller = view.activate();
        advance(Duration::from_millis(10)).await;
        drop(poller);

        advance(PERIOD * 5).await;
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn applies_listing_and_signals_update() {
        let backend = Arc::new(Listing::default());
        let view = view(backend.clone());
        let mut updates = view.subscribe();

        let poller = view.activate();
        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow_and_update(), 1);

        let state = view.snapshot();
        assert_eq!(state.queries[0].id, "call-0");
        assert_eq!(state.applied_seq, 1);
        assert!(state.updated_at.is_some());
        assert_eq!(state.author, view.current_author());

        poller.deactivate().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_does_not_overwrite_newer_one() {
        // First poll takes 5s; polls 2.. answer at once.
        let backend = Arc::new(Listing {
            delays: vec![Duration::from_millis(5000)],
            ..Default::default()
        });
        let view = MonitoringView::new(
            backend.clone(),
            Arc::new(IdentityStore::in_memory()),
            Duration::from_millis(1000),
        );

        let poller = view.activate();
        advance(Duration::from_millis(1010)).await;
        assert_eq!(view.snapshot().queries[0].id, "call-1");

        // call-0 comes back at t=5s, after polls 2..5 were applied.
        advance(Duration::from_millis(4500)).await;
        let state = view.snapshot();
        assert_ne!(state.queries[0].id, "call-0");
        assert!(state.applied_seq >= 5);

        poller.deactivate().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_fetches_a_fresh_listing() {
        let backend = Arc::new(Listing::default());
        let view = view(backend.clone());

        let poller = view.activate();
        advance(PERIOD * 3 + Duration::from_millis(10)).await;
        assert_eq!(view.snapshot().queries[0].id, "call-3");
        poller.deactivate().await;

        let poller = view.activate();
        advance(Duration::from_millis(10)).await;
        assert_eq!(backend.calls(), 5);
        let state = view.snapshot();
        assert_eq!(state.queries[0].id, "call-4");
        assert_eq!(state.applied_seq, 5);

        poller.deactivate().await;
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_poll_is_cancelled_on_deactivate() {
        let backend = Arc::new(Listing {
            delays: vec![Duration::from_millis(2000)],
            ..Default::default()
        });
        let view = view(backend.clone());

        let poller = view.activate();
        advance(Duration::from_millis(10)).await;
        poller.deactivate().await;

        advance(PERIOD).await;
        let state = view.snapshot();
        assert!(state.queries.is_empty());
        assert_eq!(state.applied_seq, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_and_polling_continues() {
        let backend = Arc::new(Listing {
            failing: true,
            ..Default::default()
        });
        let view = view(backend.clone());

        let poller = view.activate();
        advance(Duration::from_millis(10)).await;
        let notice = view.snapshot().notice.expect("failure notice");
        assert_eq!(
            notice.to_string(),
            "[ERROR] [MONITORING SERVICE] query list not found"
        );

        advance(PERIOD * 2).await;
        assert_eq!(backend.calls(), 3);
        assert!(poller.is_active());
        poller.deactivate().await;
    }

    #[test]
    fn own_queries_use_current_author() {
        let state = MonitoringState {
            queries: vec![
                query("1", "me", QueryStatus::Running),
                query("2", "someone", QueryStatus::Running),
            ],
            author: "me".into(),
            ..Default::default()
        };
        let ids: Vec<&str> = state.own_queries().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }
}
