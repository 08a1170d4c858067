//! burnwell-client: assessment backends and configuration.
//!
//! Implements the `AssessmentApi` trait over HTTP for the wellness server and
//! in memory for offline runs, and loads the client configuration that picks
//! between them.

pub mod config;
pub mod http;
pub mod mbi;
pub mod offline;

pub use config::{create_backend, load_config, load_config_from, BackendConfig, BurnwellConfig};
pub use http::HttpBackend;
pub use offline::{Endpoint, OfflineBackend};
