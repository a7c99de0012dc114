//! FetchService - the surface the gateway talks to.
//!
//! Wraps a store, a fetch client and (in async mode) a dispatcher. The mode is
//! fixed at construction.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{Instrument, Span};

use super::dispatcher::Dispatcher;
use super::pipeline::run_job;
use super::status::DispatchCounts;
use crate::domain::{Error, FetchSpec, Job, Paginator, Request, RequestId, Response, Result};
use crate::ports::{FetchClient, RequestStore};

/// How submitted fetches are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run the pipeline on its own task, wait for it and return the response.
    /// Dropping the caller's future does not cancel the pipeline.
    Sync,
    /// Queue the job for a pool of `pool_size` workers.
    Async { pool_size: NonZeroUsize },
}

/// Outcome of `FetchService::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Completed(Response),
    /// Queued; poll `get` / `list` for the response.
    Accepted,
}

pub struct FetchService {
    store: Arc<dyn RequestStore>,
    client: Arc<dyn FetchClient>,
    dispatcher: Option<Dispatcher>,
    span: Span,
}

impl FetchService {
    /// Must be called inside a tokio runtime when `mode` is `Async`.
    pub fn new(
        mode: DispatchMode,
        store: Arc<dyn RequestStore>,
        client: Arc<dyn FetchClient>,
        span: Span,
    ) -> Self {
        let dispatcher = match mode {
            DispatchMode::Sync => None,
            DispatchMode::Async { pool_size } => Some(Dispatcher::spawn(
                pool_size,
                Arc::clone(&store),
                Arc::clone(&client),
                span.clone(),
            )),
        };

        Self {
            store,
            client,
            dispatcher,
            span,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        match &self.dispatcher {
            None => DispatchMode::Sync,
            Some(d) => DispatchMode::Async {
                pool_size: d.pool_size(),
            },
        }
    }

    pub async fn submit(&self, spec: FetchSpec) -> Result<Submission> {
        match &self.dispatcher {
            Some(dispatcher) => {
                dispatcher.submit(Job::new(spec)).await?;
                Ok(Submission::Accepted)
            }
            None => {
                let store = Arc::clone(&self.store);
                let client = Arc::clone(&self.client);
                let span = self.span.clone();

                // own task: a dropped caller must not abandon a stored request
                let task = tokio::spawn(
                    async move {
                        let outcome = run_job(store.as_ref(), client.as_ref(), spec).await;
                        if let Err(err) = &outcome {
                            tracing::warn!(
                                stage = %err.stage,
                                request_id = ?err.request_id,
                                error = %err.source,
                                "inline fetch failed"
                            );
                        }
                        outcome
                    }
                    .instrument(span),
                );

                match task.await {
                    Ok(outcome) => Ok(Submission::Completed(outcome?)),
                    Err(e) => Err(Error::internal(format!("inline fetch task failed: {e}"))),
                }
            }
        }
    }

    pub async fn list(&self, paginator: Option<Paginator>) -> Result<Vec<Request>> {
        self.store.get_all_requests(paginator).await
    }

    pub async fn get(&self, id: RequestId) -> Result<Request> {
        self.store.get_request(id).await
    }

    pub async fn delete(&self, id: RequestId) -> Result<()> {
        self.store.delete_request(id).await
    }

    /// Drain and stop the dispatcher. No-op in sync mode.
    pub async fn shutdown(&self) -> Result<()> {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.close().await,
            None => Ok(()),
        }
    }

    /// Dispatcher counters; `None` in sync mode.
    pub fn counts(&self) -> Option<DispatchCounts> {
        self.dispatcher.as_ref().map(Dispatcher::counts)
    }
}
