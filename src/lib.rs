//! Tier-based tour pricing: cost configuration, price calculation and the
//! durable price store service.

pub mod cache;
pub mod config;
pub mod error;
pub mod pricing;

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::pricing::RemoteStore;

/// Shared state of the price store service
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RemoteStore>,
    /// Backend name reported by `/health`
    pub backend: &'static str,
}

/// Initialize tracing/logging. Call once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
