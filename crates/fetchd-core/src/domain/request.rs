//! Stored request/response pairs as seen by readers.

use serde::{Deserialize, Serialize};

use super::fetch::FetchSpec;
use super::ids::RequestId;
use super::response::Response;

/// A copy of one stored record. Readers never get references into a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub fetch: FetchSpec,
    /// `None` until the fetch has completed and the response was attached.
    pub response: Option<Response>,
}

impl Request {
    pub fn is_answered(&self) -> bool {
        self.response.is_some()
    }
}
