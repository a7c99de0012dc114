//! HttpFetchClient - the real outbound client.
//!
//! ureq is blocking, so each fetch runs on the blocking pool
//! (`spawn_blocking`). The timeout is configured once for the agent and
//! covers the whole call.

use std::time::Duration;

use async_trait::async_trait;
use tracing::Span;
use ureq::http::header::CONTENT_LENGTH;
use ureq::{Agent, RequestBuilder};

use crate::domain::{Error, FetchSpec, Headers, Method, RequestId, Response, Result};
use crate::ports::FetchClient;

/// Default timeout for one outbound call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct HttpFetchClient {
    agent: Agent,
    span: Span,
}

impl HttpFetchClient {
    pub fn new(timeout: Duration, span: Span) -> Self {
        // remote 4xx/5xx are ordinary responses here, not errors
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent, span }
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn fetch(&self, id: RequestId, spec: &FetchSpec) -> Result<Response> {
        let agent = self.agent.clone();
        let span = self.span.clone();
        let spec = spec.clone();

        tokio::task::spawn_blocking(move || span.in_scope(|| fetch_blocking(&agent, id, &spec)))
            .await
            .map_err(|e| Error::internal(format!("fetch task for {id} failed: {e}")))?
    }
}

fn fetch_blocking(agent: &Agent, id: RequestId, spec: &FetchSpec) -> Result<Response> {
    let url = spec.url.as_str();
    let body = spec.body.as_deref().map(str::as_bytes);

    let result = match spec.method {
        Method::Get => with_headers(agent.get(url), &spec.headers).call(),
        Method::Post => {
            let request = with_headers(agent.post(url), &spec.headers);
            match body {
                Some(body) => request.send(body),
                None => request.send_empty(),
            }
        }
        Method::Delete => {
            let request = with_headers(agent.delete(url), &spec.headers);
            match body {
                Some(body) => request.force_send_body().send(body),
                None => request.call(),
            }
        }
    };

    match result {
        Ok(response) => {
            let reported = response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok());
            tracing::debug!(%id, status = response.status().as_u16(), "fetched");
            Ok(Response::new(id, response.status().as_u16())
                .with_headers(collect_headers(response.headers()))
                .with_content_length(reported))
        }
        // the request itself could not be built (bad header name/value, ...)
        Err(ureq::Error::Http(e)) => Err(Error::invalid_input(format!(
            "error creating HTTP request: {e}"
        ))),
        Err(e) => {
            tracing::warn!(%id, url, error = %e, "external resource unreachable");
            Ok(Response::degraded(id))
        }
    }
}

fn with_headers<B>(mut request: RequestBuilder<B>, headers: &Headers) -> RequestBuilder<B> {
    for (name, values) in headers {
        for value in values {
            request = request.header(name.as_str(), value.as_str());
        }
    }
    request
}

fn collect_headers(map: &ureq::http::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}
