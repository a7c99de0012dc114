//! RequestStore port - registry of request/response records.
//!
//! # Contract
//! - every operation is linearizable and safe under arbitrary concurrent callers
//! - listings are ordered by insertion and return copies
//! - a response is attached at most once; deletion is final

use async_trait::async_trait;

use crate::domain::{FetchSpec, Paginator, Request, RequestId, Response, Result};

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Create a record with no response yet and return its fresh id.
    async fn add_request(&self, spec: FetchSpec) -> Result<RequestId>;

    /// Attach the response for `id`.
    ///
    /// Errors: `NotFound` for an unknown id; `InvalidInput` when
    /// `response.id != id` or a response is already attached.
    async fn add_response(&self, id: RequestId, response: Response) -> Result<()>;

    /// Remove the record. `NotFound` if it does not exist (anymore).
    async fn delete_request(&self, id: RequestId) -> Result<()>;

    /// Records in insertion order, windowed by `paginator` when given.
    async fn get_all_requests(&self, paginator: Option<Paginator>) -> Result<Vec<Request>>;

    async fn get_request(&self, id: RequestId) -> Result<Request>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
