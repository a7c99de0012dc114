//! Domain model: ids, fetch specs, responses, stored requests, paging, errors.

pub mod errors;
pub mod fetch;
pub mod ids;
pub mod job;
pub mod paginator;
pub mod request;
pub mod response;

pub use self::errors::{Error, ErrorKind, Result};
pub use self::fetch::{FetchRequest, FetchSpec, Headers, Method};
pub use self::ids::RequestId;
pub use self::job::Job;
pub use self::paginator::Paginator;
pub use self::request::Request;
pub use self::response::{DEGRADED_STATUS, Response};
