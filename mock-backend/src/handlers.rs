use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{Query, QueryStatus, SearchRequest};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::{AppState, MockQuery};

/// Body of the start/kill acknowledgements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/process/start/:id", post(start_query))
        .route("/process/kill/:id", post(kill_query))
        .route("/monitoring/queries", get(list_queries))
        .route("/monitoring/queries/:id", get(get_query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Answers with a pending query carrying the canned interpretation
async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Query>, StatusCode> {
    state.record(
        "POST",
        "/search".to_string(),
        serde_json::to_value(&req).ok(),
    );

    if req.query.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let query = Query {
        id: state.allocate_id(),
        name: req.query,
        author: req.author,
        status: QueryStatus::Pending,
        details: Some(state.interpretation.lock().unwrap().clone()),
        tasks: vec![],
    };

    info!("interpreted query {} for author {}", query.id, query.author);
    state
        .queries
        .lock()
        .unwrap()
        .push(MockQuery::pending(query.clone()));

    Ok(Json(query))
}

async fn start_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, StatusCode> {
    state.record("POST", format!("/process/start/{id}"), None);

    let plan = state.task_plan.lock().unwrap().clone();
    let mut queries = state.queries.lock().unwrap();
    let entry = queries
        .iter_mut()
        .find(|q| q.query.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    match entry.query.status {
        QueryStatus::Pending => {
            entry.start(&plan);
            info!("query {} started with {} tasks", id, plan.len());
        }
        // a second start is a no-op
        QueryStatus::Running => {}
        _ => return Err(StatusCode::CONFLICT),
    }

    Ok(Json(Ack { ok: true }))
}

async fn kill_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, StatusCode> {
    state.record("POST", format!("/process/kill/{id}"), None);

    let mut queries = state.queries.lock().unwrap();
    let entry = queries
        .iter_mut()
        .find(|q| q.query.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    if entry.query.status == QueryStatus::Completed {
        return Err(StatusCode::CONFLICT);
    }
    entry.query.status = QueryStatus::Killed;
    info!("query {} killed", id);

    Ok(Json(Ack { ok: true }))
}

// Every listing moves running queries one step along their plan
async fn list_queries(State(state): State<AppState>) -> Json<Vec<Query>> {
    state.record("GET", "/monitoring/queries".to_string(), None);

    let mut queries = state.queries.lock().unwrap();
    let mut out = Vec::with_capacity(queries.len());
    for entry in queries.iter_mut() {
        entry.advance();
        out.push(entry.query.clone());
    }

    Json(out)
}

async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Query>, StatusCode> {
    state.record("GET", format!("/monitoring/queries/{id}"), None);

    state.query(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn search_then_start_then_list() {
        let state = AppState::new();
        let app = build_router(state.clone());

        let (status, body) = call(
            &app,
            "POST",
            "/search",
            Some(json!({ "query": "Tous les incendies entre 2003 et 2009", "author": "4242" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let q: Query = serde_json::from_slice(&body).unwrap();
        assert_eq!(q.id, "1");
        assert_eq!(q.status, QueryStatus::Pending);
        assert_eq!(q.details.unwrap().event.as_deref(), Some("incendie"));

        let (status, _) = call(&app, "POST", "/process/start/1", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "GET", "/monitoring/queries", None).await;
        let list: Vec<Query> = serde_json::from_slice(&body).unwrap();
        assert_eq!(list[0].status, QueryStatus::Running);
        assert_eq!(list[0].tasks[0].progress, 5);

        let paths: Vec<String> = state.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/search", "/process/start/1", "/monitoring/queries"]);
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let app = build_router(AppState::new());
        for (method, uri) in [
            ("POST", "/process/start/9"),
            ("POST", "/process/kill/9"),
            ("GET", "/monitoring/queries/9"),
        ] {
            let (status, _) = call(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn killed_query_cannot_be_started() {
        let state = AppState::new();
        let app = build_router(state.clone());
        call(&app, "POST", "/search", Some(json!({ "query": "x", "author": "1" }))).await;

        let (status, _) = call(&app, "POST", "/process/kill/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.query("1").unwrap().status, QueryStatus::Killed);

        let (status, _) = call(&app, "POST", "/process/start/1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
