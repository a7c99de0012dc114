//! Job pipeline: add request -> fetch -> add response.
//!
//! Shared by the dispatcher's workers and by the synchronous service mode.
//! The three steps run strictly in order; the response is attached only after
//! the fetch returned, so a listing never sees a half-written response.

use std::fmt;

use thiserror::Error;

use crate::domain::{Error, FetchSpec, RequestId, Response};
use crate::ports::{FetchClient, RequestStore};

/// Step of the pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AddRequest,
    Fetch,
    AddResponse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::AddRequest => "add_request",
            Stage::Fetch => "fetch",
            Stage::AddResponse => "add_response",
        })
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    /// Known once `add_request` succeeded.
    pub request_id: Option<RequestId>,
    #[source]
    pub source: Error,
}

impl From<PipelineError> for Error {
    fn from(err: PipelineError) -> Self {
        err.source
    }
}

/// Run one job to completion and return the attached response.
///
/// # Ordering
/// - `add_request` -> `fetch` -> `add_response`, each awaited before the next
/// - the first failing step ends the job; later steps are not attempted
///
/// # Partial results
/// - a failure after `add_request` leaves the record stored without a
///   response; `PipelineError::request_id` names it
/// - nothing is retried here; callers decide what to log or count
pub async fn run_job(
    store: &dyn RequestStore,
    client: &dyn FetchClient,
    spec: FetchSpec,
) -> Result<Response, PipelineError> {
    let id = store
        .add_request(spec.clone())
        .await
        .map_err(|source| PipelineError {
            stage: Stage::AddRequest,
            request_id: None,
            source,
        })?;

    let fail = |stage, source| PipelineError {
        stage,
        request_id: Some(id),
        source,
    };

    let response = client
        .fetch(id, &spec)
        .await
        .map_err(|e| fail(Stage::Fetch, e))?;

    store
        .add_response(id, response.clone())
        .await
        .map_err(|e| fail(Stage::AddResponse, e))?;

    Ok(response)
}
