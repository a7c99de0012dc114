//! Job - one unit of work for the dispatcher.

use super::fetch::FetchSpec;

/// Wraps a validated fetch spec. Constructing a `Job` needs a `FetchSpec`,
/// so nothing unvalidated can be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    spec: FetchSpec,
}

impl Job {
    pub fn new(spec: FetchSpec) -> Self {
        Self { spec }
    }

    pub fn into_spec(self) -> FetchSpec {
        self.spec
    }
}
