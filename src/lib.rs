//! Image Generation Relay
//!
//! Accepts a prompt over HTTP, has an external provider generate the image,
//! waits for it, and republishes the result to object storage under a public URL.

pub mod api;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod storage;
pub mod transport;

pub use error::{AppError, Result};

use std::sync::Arc;

use orchestrator::Orchestrator;

/// Application state shared across all handlers
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}
