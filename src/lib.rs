//! Live guestbook server: visitors post wishes and tap hearts, and every
//! connected browser sees the change at once.
//!
//! ```text
//! browser ──ws──┐                        ┌── GuestbookStore ── greetings.json
//! browser ──ws──┼── Job queue ── worker ─┼── RateLimiter          hearts.json
//! GET /api/* ───┘    (mpsc)       │      └── ContentFilter
//!                                 └── SessionHub ── fan-out to every session
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod handlers;
pub mod hub;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod worker;

use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Args;
use crate::error::GuestbookError;
use crate::filter::ContentFilter;
use crate::gateway::Gateway;
use crate::hub::SessionHub;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;
use crate::store::GuestbookStore;

/// Load the deny-list and persisted state, then spawn the gateway worker.
pub fn start(args: &Args) -> Result<(Arc<AppState>, JoinHandle<()>), GuestbookError> {
    let filter = ContentFilter::load(&args.badwords, args.max_wish_len)?;
    let store = GuestbookStore::open(&args.data_dir)?;
    let limiter = RateLimiter::new(args.rate_limit_policy());
    let gateway = Gateway::new(store, limiter, filter);

    let hub = Arc::new(SessionHub::new());
    let (job_tx, job_rx) = mpsc::channel(args.queue_capacity);
    let worker_hub = hub.clone();
    let worker =
        tokio::task::spawn_blocking(move || worker::gateway_worker(job_rx, gateway, worker_hub));

    let state = Arc::new(AppState {
        jobs: job_tx,
        hub,
        session_buffer: args.session_buffer,
    });
    Ok((state, worker))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/api/greetings", get(handlers::greetings_handler))
        .route("/api/hearts", get(handlers::hearts_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(state)
}
