pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod lock;
pub mod ports;
pub mod services;
pub mod startup;
pub mod validation;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    routing::{get, post},
};

use crate::health::DependencyChecker;
use crate::lock::LockCoordinator;
use crate::services::TransactionService;

#[derive(Clone)]
pub struct AppState {
    pub transactions: TransactionService,
    pub locks: Arc<dyn LockCoordinator>,
    pub lock_wait: Duration,
    pub checkers: Vec<(String, Arc<dyn DependencyChecker>)>,
    pub start_time: Instant,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/transaction/use", post(handlers::transactions::use_balance))
        .route(
            "/transaction/cancel",
            post(handlers::transactions::cancel_balance),
        )
        .route(
            "/transaction/:transaction_id",
            get(handlers::transactions::query_transaction),
        )
        .with_state(state)
}
