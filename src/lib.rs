//! Libris - library circulation and inventory engine
//!
//! The lending lifecycle of a library: a catalog of books with physical
//! copies, borrow requests with staff approval, return processing and
//! late-return fines, all backed by Postgres. The engine is embedded as
//! library-level operations by a presentation layer; it owns no wire
//! protocol, authentication or catalog metadata.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for an embedding binary, honoring `RUST_LOG` when
/// set and the logging config otherwise.
pub fn init_tracing(config: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
