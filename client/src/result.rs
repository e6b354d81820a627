use common::Query;
use std::sync::Arc;

use crate::api::QueryBackend;
use crate::notify::{self, Component, Notice};

#[derive(Debug, Clone, Default)]
pub struct ResultState {
    pub query_id: Option<String>,
    pub query: Option<Query>,
    pub busy: bool,
    pub notice: Option<Notice>,
}

/// Result viewer for one finalized query.
pub struct ResultView {
    backend: Arc<dyn QueryBackend>,
    state: ResultState,
}

impl ResultView {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            backend,
            state: ResultState::default(),
        }
    }

    pub fn state(&self) -> &ResultState {
        &self.state
    }

    /// Fetches `query_id`. On failure nothing from a previous fetch stays on
    /// screen, only the error notice.
    pub async fn open(&mut self, query_id: &str) -> Option<&Query> {
        self.state = ResultState {
            query_id: Some(query_id.to_string()),
            busy: true,
            ..Default::default()
        };

        let result = self.backend.fetch_result(query_id).await;
        self.state.busy = false;

        match result {
            Ok(query) => self.state.query = Some(query),
            Err(err) => self.state.notice = Some(notify::report(Component::Results, &err)),
        }
        self.state.query.as_ref()
    }
}
