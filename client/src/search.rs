//! Query submission: interpretation, then confirm or cancel.
//!
//! Seen from the client a submitted query goes
//! `Draft -> Interpreted -> Confirmed` or `Interpreted -> Cancelled`; the
//! backend stays authoritative for everything after that. Starting or killing
//! needs an [`Interpretation`], which only a successful interpret hands out.

use common::{Query, QueryId, SearchRequest};
use std::sync::Arc;
use tracing::info;

use crate::api::QueryBackend;
use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityStore;
use crate::notify::{self, Component, Notice};

/// A query the backend interpreted but has not started.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    query: Query,
}

impl Interpretation {
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn id(&self) -> &str {
        &self.query.id
    }
}

#[derive(Clone)]
pub struct QuerySender {
    backend: Arc<dyn QueryBackend>,
    identity: Arc<IdentityStore>,
}

impl QuerySender {
    pub fn new(backend: Arc<dyn QueryBackend>, identity: Arc<IdentityStore>) -> Self {
        Self { backend, identity }
    }

    /// Sends the text with the current author identity for interpretation.
    pub async fn interpret(&self, text: &str) -> ClientResult<Interpretation> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation("empty query".to_string()));
        }

        let request = SearchRequest {
            query: text.to_string(),
            author: self.identity.get_or_create_author_id(),
        };
        info!("query sent: {}", request.query);

        let query = self.backend.interpret(&request).await?;
        Ok(Interpretation { query })
    }

    pub async fn start(&self, interpretation: Interpretation) -> ClientResult<QueryId> {
        self.backend.start(interpretation.id()).await?;
        Ok(interpretation.query.id)
    }

    pub async fn kill(&self, interpretation: Interpretation) -> ClientResult<QueryId> {
        self.backend.kill(interpretation.id()).await?;
        Ok(interpretation.query.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

/// Last thing the search bar displayed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Phase {
    #[default]
    Draft,
    Interpreted(Interpretation),
    Confirmed(QueryId),
    Cancelled(QueryId),
}

#[derive(Debug, Clone, Default)]
pub struct SearchBarState {
    pub input: String,
    pub busy: bool,
    pub phase: Phase,
    pub notice: Option<Notice>,
}

/// View-state of the search bar.
pub struct SearchBar {
    sender: QuerySender,
    state: SearchBarState,
}

impl SearchBar {
    pub fn new(sender: QuerySender) -> Self {
        Self {
            sender,
            state: SearchBarState::default(),
        }
    }

    pub fn state(&self) -> &SearchBarState {
        &self.state
    }

    pub fn pending(&self) -> Option<&Interpretation> {
        match &self.state.phase {
            Phase::Interpreted(i) => Some(i),
            _ => None,
        }
    }

    /// Blank input is ignored without a request.
    pub async fn submit(&mut self, text: &str) -> Option<&Interpretation> {
        self.state.input = text.to_string();
        if text.trim().is_empty() {
            return None;
        }

        self.state.busy = true;
        self.state.notice = None;
        let result = self.sender.interpret(text).await;
        self.state.busy = false;

        match result {
            Ok(interpretation) => self.state.phase = Phase::Interpreted(interpretation),
            Err(err) => {
                self.state.phase = Phase::Draft;
                self.state.notice = Some(notify::report(Component::QuerySender, &err));
            }
        }
        self.pending()
    }

    /// Confirms or cancels the pending interpretation. Returns false when
    /// there was nothing to decide on or the request failed; a failed request
    /// leaves the interpretation pending so the user can decide again.
    pub async fn decide(&mut self, decision: Decision) -> bool {
        let Some(interpretation) = self.pending().cloned() else {
            return false;
        };

        self.state.busy = true;
        let result = match decision {
            Decision::Confirm => self.sender.start(interpretation).await,
            Decision::Cancel => self.sender.kill(interpretation).await,
        };
        self.state.busy = false;

        match result {
            Ok(id) => {
                let (phase, detail) = match decision {
                    Decision::Confirm => (Phase::Confirmed(id.clone()), format!("Query started: {id}")),
                    Decision::Cancel => (Phase::Cancelled(id.clone()), format!("Query killed: {id}")),
                };
                self.state.notice = Some(notify::inform(Component::QuerySender, detail));
                self.state.phase = phase;
                true
            }
            Err(err) => {
                self.state.notice = Some(notify::report(Component::QuerySender, &err));
                false
            }
        }
    }
}
