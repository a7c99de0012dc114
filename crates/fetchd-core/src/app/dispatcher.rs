//! Dispatcher - bounded queue feeding a fixed pool of workers.
//!
//! - The queue holds at most one job per worker; `submit` waits while it is full.
//! - `close` stops intake, lets the workers drain every accepted job, then
//!   waits for all of them to exit.
//! - A failed (or panicking) job is logged and counted; its worker moves on to
//!   the next job. Nothing is retried or requeued.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span};

use super::pipeline::run_job;
use super::status::{DispatchCounts, DispatchStats};
use crate::domain::{Error, Job, Result};
use crate::ports::{FetchClient, RequestStore};

pub struct Dispatcher {
    /// `None` once `close` has begun.
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<DispatchStats>,
    pool_size: NonZeroUsize,
    span: Span,
}

impl Dispatcher {
    /// Spawn `pool_size` workers on the current tokio runtime.
    ///
    /// Every event of the dispatcher and its workers is emitted inside `span`.
    pub fn spawn(
        pool_size: NonZeroUsize,
        store: Arc<dyn RequestStore>,
        client: Arc<dyn FetchClient>,
        span: Span,
    ) -> Self {
        let (tx, rx) = mpsc::channel(pool_size.get());
        let rx = Arc::new(Mutex::new(rx));
        let stats = Arc::new(DispatchStats::default());

        let mut joins = Vec::with_capacity(pool_size.get());
        for worker_id in 0..pool_size.get() {
            let worker = Worker {
                rx: Arc::clone(&rx),
                store: Arc::clone(&store),
                client: Arc::clone(&client),
                stats: Arc::clone(&stats),
            };
            let worker_span = tracing::debug_span!(parent: &span, "worker", worker_id);
            joins.push(tokio::spawn(worker.run().instrument(worker_span)));
        }

        span.in_scope(|| tracing::info!(pool_size = pool_size.get(), "dispatcher started"));

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(joins),
            stats,
            pool_size,
            span,
        }
    }

    pub fn pool_size(&self) -> NonZeroUsize {
        self.pool_size
    }

    /// Queue `job`, waiting while the queue is full.
    ///
    /// Fire-and-forget: the outcome is only visible through the store.
    /// Fails with `DispatcherClosed` once `close` has begun.
    pub async fn submit(&self, job: Job) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .await
            .clone()
            .ok_or(Error::DispatcherClosed)?;

        sender.send(job).await.map_err(|_| Error::DispatcherClosed)?;
        self.stats.record_submitted();
        Ok(())
    }

    /// Stop accepting jobs, drain the queue and wait for every worker to exit.
    ///
    /// Only the first call drains; later calls fail with `DispatcherClosed`.
    pub async fn close(&self) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .await
            .take()
            .ok_or(Error::DispatcherClosed)?;
        // workers see the end of the queue once this and every in-flight
        // `submit` clone are gone
        drop(sender);

        let joins = std::mem::take(&mut *self.workers.lock().await);

        async {
            tracing::info!(pending = self.counts().pending(), "draining dispatcher");

            let mut crashed = 0usize;
            for join in joins {
                if let Err(e) = join.await {
                    crashed += 1;
                    tracing::error!(error = %e, "worker task ended abnormally");
                }
            }

            let counts = self.counts();
            tracing::info!(
                completed = counts.completed,
                failed = counts.failed,
                "dispatcher drained"
            );

            if crashed > 0 {
                return Err(Error::internal(format!("{crashed} worker(s) crashed")));
            }
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    pub fn counts(&self) -> DispatchCounts {
        self.stats.snapshot(self.pool_size.get())
    }
}

struct Worker {
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    store: Arc<dyn RequestStore>,
    client: Arc<dyn FetchClient>,
    stats: Arc<DispatchStats>,
}

impl Worker {
    async fn run(self) {
        tracing::debug!("worker started");

        while let Some(job) = self.next_job().await {
            let store = Arc::clone(&self.store);
            let client = Arc::clone(&self.client);

            // own task per job: a panic inside a store or client only loses that job
            let task = tokio::spawn(
                async move { run_job(store.as_ref(), client.as_ref(), job.into_spec()).await }
                    .in_current_span(),
            );

            match task.await {
                Ok(Ok(response)) => {
                    self.stats.record_completed();
                    tracing::debug!(request_id = %response.id, status = response.status, "job completed");
                }
                Ok(Err(err)) => {
                    self.stats.record_failed();
                    tracing::error!(
                        stage = %err.stage,
                        request_id = ?err.request_id,
                        error = %err.source,
                        "job failed"
                    );
                }
                Err(e) => {
                    self.stats.record_failed();
                    tracing::error!(error = %e, "job panicked");
                }
            }
        }

        tracing::debug!("worker stopped");
    }

    /// Next queued job, or `None` once the queue is closed and empty.
    async fn next_job(&self) -> Option<Job> {
        self.rx.lock().await.recv().await
    }
}
