//! Berth Client - Orchestrator API access for the Berth scheduler
//!
//! This crate provides:
//! - An HTTP client for node listing, pod watches, and bindings
//! - A newline-delimited watch event decoder
//! - Implementations of the scheduler's inventory, event source, and binder seams

pub mod adapters;
pub mod api_client;
pub mod error;
pub mod watch;

// Re-export commonly used types
pub use api_client::{ApiClient, ClientConfig, DEFAULT_API_URL};
pub use error::{ClientError, Result};
pub use watch::decode_watch_lines;
