//! REST client for the query backend

use async_trait::async_trait;
use common::{Query, SearchRequest};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// The backend operations the views depend on.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// `POST /search`: NLP interpretation of the free text, not started yet.
    async fn interpret(&self, request: &SearchRequest) -> ClientResult<Query>;

    /// `POST /process/start/{id}`
    async fn start(&self, query_id: &str) -> ClientResult<()>;

    /// `POST /process/kill/{id}`
    async fn kill(&self, query_id: &str) -> ClientResult<()>;

    /// `GET /monitoring/queries`
    async fn list_queries(&self) -> ClientResult<Vec<Query>>;

    /// `GET /monitoring/queries/{id}`
    async fn fetch_result(&self, query_id: &str) -> ClientResult<Query>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("geoquery/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, resource: &str) -> ClientResult<T> {
        let resp = self.http.get(self.url(path)).send().await?;
        decode(resp, resource).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, resource: &str) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        // `.json()` also sets Content-Type: application/json
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        decode(resp, resource).await
    }

    /// POST without a body; the ack payload is not interpreted.
    async fn post_empty(&self, path: &str, resource: &str) -> ClientResult<()> {
        let resp = self.http.post(self.url(path)).send().await?;
        let resp = check_status(resp, resource).await?;
        let ack = resp.text().await?;
        debug!("{} acknowledged: {}", path, ack);
        Ok(())
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    async fn interpret(&self, request: &SearchRequest) -> ClientResult<Query> {
        self.post_json("/search", request, "search").await
    }

    async fn start(&self, query_id: &str) -> ClientResult<()> {
        let id = path_segment(query_id)?;
        self.post_empty(&format!("/process/start/{}", id), &query_resource(id))
            .await
    }

    async fn kill(&self, query_id: &str) -> ClientResult<()> {
        let id = path_segment(query_id)?;
        self.post_empty(&format!("/process/kill/{}", id), &query_resource(id))
            .await
    }

    async fn list_queries(&self) -> ClientResult<Vec<Query>> {
        self.get_json("/monitoring/queries", "query list").await
    }

    async fn fetch_result(&self, query_id: &str) -> ClientResult<Query> {
        let id = path_segment(query_id)?;
        self.get_json(&format!("/monitoring/queries/{}", id), &query_resource(id))
            .await
    }
}

fn query_resource(id: &str) -> String {
    format!("query {}", id)
}

/// Query ids are server-assigned and end up in the URL path as is.
fn path_segment(id: &str) -> ClientResult<&str> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ClientError::Validation(format!("bad query id {:?}", id)));
    }
    Ok(id)
}

async fn check_status(resp: Response, resource: &str) -> ClientResult<Response> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(resource.to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Status { status, body });
    }
    Ok(resp)
}

async fn decode<T: DeserializeOwned>(resp: Response, resource: &str) -> ClientResult<T> {
    let resp = check_status(resp, resource).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
