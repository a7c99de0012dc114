//! FetchClient port - performs the outbound call for a stored request.

use async_trait::async_trait;

use crate::domain::{FetchSpec, RequestId, Response, Result};

/// Fetches the external resource described by a spec.
///
/// # Contract
/// - the returned `Response` carries the `id` it was called with
/// - a non-2xx answer from the remote is a normal `Response`, status passed through
/// - transport failures (refused connection, timeout, no response) are not
///   errors: answer with `Response::degraded(id)`
/// - `InvalidInput` only when the request cannot be built at all (bad header
///   name or value); `Internal` for runtime failures
///
/// # Thread Safety
/// - `Send + Sync`: one client is shared by every worker and by sync-mode
///   callers. The timeout is fixed at construction, not per call.
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch(&self, id: RequestId, spec: &FetchSpec) -> Result<Response>;
}
