//! fetchd-server: axum gateway, configuration and logging for the `fetchd`
//! binary.

pub mod config;
pub mod routes;
pub mod telemetry;

pub use routes::app;
