//! App - wires the ports together.
//!
//! - **pipeline**: one job, add request -> fetch -> add response
//! - **dispatcher**: bounded queue + worker pool running the pipeline
//! - **service**: sync/async facade used by the gateway
//! - **status**: dispatcher counters

pub mod dispatcher;
pub mod pipeline;
pub mod service;
pub mod status;

pub use self::dispatcher::Dispatcher;
pub use self::pipeline::{PipelineError, Stage, run_job};
pub use self::service::{DispatchMode, FetchService, Submission};
pub use self::status::DispatchCounts;
