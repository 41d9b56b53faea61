//! Read-only REST API over one completed scenario.
//!
//! Provides four GET endpoints:
//! - `/summary`: annual totals, bills and financial summary
//! - `/hours`: hourly records with optional range filtering
//! - `/projection`: the yearly cash-flow table
//! - `/snapshot`: flat key-value view of the whole outcome

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::error::Result;
use crate::io::snapshot::{Snapshot, flatten};
use crate::scenario::ScenarioOutcome;

pub use types::{AnnualTotals, ErrorResponse, HoursQuery, SummaryResponse};

/// Immutable application state shared across all request handlers.
///
/// Built once after the run completes, so handlers need no locks.
pub struct AppState {
    pub outcome: ScenarioOutcome,
    pub snapshot: Snapshot,
}

impl AppState {
    /// Wraps an outcome and precomputes its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the outcome cannot be flattened.
    pub fn new(outcome: ScenarioOutcome) -> Result<Self> {
        let snapshot = flatten(&outcome)?;
        Ok(Self { outcome, snapshot })
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/hours", get(handlers::get_hours))
        .route("/projection", get(handlers::get_projection))
        .route("/snapshot", get(handlers::get_snapshot))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
