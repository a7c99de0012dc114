//! MockFetchClient - answers every fetch without touching the network.

use async_trait::async_trait;

use crate::domain::{FetchSpec, RequestId, Response, Result};
use crate::ports::FetchClient;

/// Always answers `status` with no headers and zero length.
#[derive(Debug, Clone, Copy)]
pub struct MockFetchClient {
    status: u16,
}

impl MockFetchClient {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self { status }
    }
}

impl Default for MockFetchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchClient for MockFetchClient {
    async fn fetch(&self, id: RequestId, _spec: &FetchSpec) -> Result<Response> {
        Ok(Response::new(id, self.status))
    }
}
