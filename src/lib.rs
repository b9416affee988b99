// ============================================================================
// FitSync Library
// ============================================================================

pub mod config;
pub mod core;
pub mod domain;
pub mod models;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod web;

// Re-export main types for convenience
pub use config::{AppConfig, Cli};
pub use core::{AppError, Page, Patch, RecordId, Result};
pub use reconcile::{
    ChildEntity, ChildSpec, OwnedChildren, ParentAggregate, ReconcileError, ReconcileResult,
    Reconciler, ReferenceResolver,
};
pub use store::{MemoryStore, StoreOptions};
pub use web::{AppState, build_router};

use std::sync::Arc;
use tracing::error;

/// Opens the store described by `config` and builds the HTTP router over it.
pub async fn bootstrap(config: &AppConfig) -> Result<(Arc<MemoryStore>, axum::Router)> {
    let store = Arc::new(MemoryStore::open(config.store_options()).await?);
    let state = AppState::new(Arc::clone(&store)).with_day_offset(config.day_offset);
    let router = build_router(state);
    Ok((store, router))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
