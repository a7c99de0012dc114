//! Responses from the external resource.

use serde::{Deserialize, Serialize};

use super::fetch::Headers;
use super::ids::RequestId;

/// Status reported when the external resource could not be reached at all.
pub const DEGRADED_STATUS: u16 = 500;

/// What we observed from the external resource for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    pub length: u64,
}

impl Response {
    pub fn new(id: RequestId, status: u16) -> Self {
        Self {
            id,
            status,
            headers: Headers::new(),
            length: 0,
        }
    }

    /// Stand-in for a fetch that failed at the transport level
    /// (connection refused, timeout, no response).
    pub fn degraded(id: RequestId) -> Self {
        Self::new(id, DEGRADED_STATUS)
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the length from a reported content length; unknown (`None`) or
    /// negative values become 0.
    pub fn with_content_length(mut self, reported: Option<i64>) -> Self {
        self.length = reported.map_or(0, |n| n.max(0) as u64);
        self
    }
}
