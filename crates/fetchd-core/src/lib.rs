//! fetchd-core
//!
//! Request store, fetch clients and the job dispatcher behind the fetchd
//! gateway.
//!
//! - **domain**: fetch specs, responses, stored requests, ids, errors
//! - **ports**: `RequestStore`, `FetchClient`, `IdGenerator`, `Clock`
//! - **impls**: in-memory and SQLite stores, HTTP and mock clients
//! - **app**: job pipeline, dispatcher, `FetchService`

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use domain::{Error, ErrorKind, Result};
