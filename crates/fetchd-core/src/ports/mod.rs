//! Ports - the seams between the core and its collaborators.
//!
//! Concrete variants live in `impls` and are chosen once at startup.

pub mod clock;
pub mod fetch_client;
pub mod id_generator;
pub mod request_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::fetch_client::FetchClient;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::request_store::RequestStore;
