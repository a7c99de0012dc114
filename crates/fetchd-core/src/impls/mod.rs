//! Impls - concrete variants of the ports.
//!
//! # Stores
//! - **InMemoryRequestStore**: one mutex around the record set
//! - **SqliteRequestStore**: persistent, one row per request
//!
//! # Fetch clients
//! - **HttpFetchClient**: real outbound HTTP (ureq)
//! - **MockFetchClient**: fixed answer, no network

pub mod http_client;
pub mod memory_store;
pub mod mock_client;
pub mod sqlite_store;

pub use self::http_client::{DEFAULT_FETCH_TIMEOUT, HttpFetchClient};
pub use self::memory_store::InMemoryRequestStore;
pub use self::mock_client::MockFetchClient;
pub use self::sqlite_store::{DEFAULT_OP_TIMEOUT, SqliteRequestStore};
