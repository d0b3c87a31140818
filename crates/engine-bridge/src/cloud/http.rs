//! Task client for the remote HTTP API
//!
//! Requests use `reqwest`'s blocking client on a short-lived worker thread
//! and the result comes back over an `async_channel`, so callers do not
//! need a tokio runtime.

use async_trait::async_trait;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{ApplyOptions, ApplyOutcome, CloudTaskClient, TaskDetail, TaskInfo};
use crate::error::{Error, Result};

/// Talks to `GET /tasks`, `GET /tasks/{id}`, `GET /tasks/{id}/diff` and
/// `POST /tasks/{id}/apply` with a bearer key
#[derive(Clone)]
pub struct HttpCloudClient {
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for HttpCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCloudClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

struct HttpRequest {
    method: Method,
    url: Url,
    body: Option<Value>,
    operation: String,
}

impl HttpCloudClient {
    /// Create a client for `endpoint` authenticated with `api_key`
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// The base endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = |reason: String| {
            Error::Config(format!("invalid cloud endpoint `{}`: {reason}", self.endpoint))
        };

        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str], operation: String) -> Result<HttpRequest> {
        Ok(HttpRequest {
            method,
            url: self.url(segments)?,
            body: None,
            operation,
        })
    }

    async fn send(&self, request: HttpRequest) -> Result<String> {
        let api_key = self.api_key.clone();
        let (tx, rx) = async_channel::bounded(1);

        std::thread::Builder::new()
            .name("ade-cloud-http".to_string())
            .spawn(move || {
                let _ = tx.send_blocking(send_blocking(&api_key, request));
            })?;

        rx.recv().await.map_err(|_| {
            Error::remote("cloud request", None, "worker thread exited without a response")
        })?
    }

    async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let operation = request.operation.clone();
        let body = self.send(request).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::remote(operation, None, format!("invalid JSON response: {e}")))
    }
}

fn send_blocking(api_key: &str, request: HttpRequest) -> Result<String> {
    let HttpRequest {
        method,
        url,
        body,
        operation,
    } = request;
    debug!(%method, %url, "cloud request");

    let client = Client::builder()
        .build()
        .map_err(|e| Error::remote(&operation, None, e.to_string()))?;

    let mut builder = client
        .request(method, url)
        .bearer_auth(api_key)
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json");
    if let Some(body) = &body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .map_err(|e| Error::remote(&operation, None, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::remote(operation, Some(status.as_u16()), describe_status(status)));
    }

    response
        .text()
        .map_err(|e| Error::remote(operation, Some(status.as_u16()), e.to_string()))
}

fn describe_status(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

#[async_trait]
impl CloudTaskClient for HttpCloudClient {
    async fn list(&self) -> Result<Vec<TaskInfo>> {
        let request = self.request(Method::GET, &["tasks"], "list tasks".to_string())?;
        self.send_json(request).await
    }

    async fn show(&self, id: &str) -> Result<TaskDetail> {
        let request = self.request(Method::GET, &["tasks", id], format!("show task {id}"))?;
        match self.send_json(request).await {
            Err(Error::RemoteRequest {
                status: Some(404), ..
            }) => Err(Error::NotFound { id: id.to_string() }),
            other => other,
        }
    }

    async fn diff(&self, id: &str) -> Result<String> {
        let request = self.request(Method::GET, &["tasks", id, "diff"], format!("diff task {id}"))?;
        self.send(request).await
    }

    async fn apply(&self, id: &str, options: &ApplyOptions) -> Result<ApplyOutcome> {
        let path = ["tasks", id, "apply"];
        let mut request = self.request(Method::POST, &path, format!("apply task {id}"))?;
        request.body = Some(serde_json::to_value(options)?);
        self.send_json(request).await
    }

    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }
}
