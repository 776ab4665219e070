use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tracing_subscriber::prelude::*;

use ledger_core::adapters::{self, PostgresStore};
use ledger_core::config::Config;
use ledger_core::health::{PostgresChecker, RedisChecker};
use ledger_core::lock::{LockCoordinator, RedisLockCoordinator};
use ledger_core::ports::{SystemClock, UuidIdGenerator};
use ledger_core::services::TransactionService;
use ledger_core::{AppState, create_app, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = adapters::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let report = startup::validate_environment(&config, &pool).await?;
    report.print();
    if !report.is_valid() {
        anyhow::bail!("startup validation failed");
    }

    let store = Arc::new(PostgresStore::new(pool.clone()));
    let locks: Arc<dyn LockCoordinator> = Arc::new(RedisLockCoordinator::new(&config.redis_url)?);
    let transactions = TransactionService::new(
        store.clone(),
        store,
        Arc::new(SystemClock),
        Arc::new(UuidIdGenerator),
    );

    let state = AppState {
        transactions,
        locks,
        lock_wait: config.lock_wait(),
        checkers: vec![
            (
                "postgres".to_string(),
                Arc::new(PostgresChecker::new(pool.clone())) as _,
            ),
            (
                "redis".to_string(),
                Arc::new(RedisChecker::new(&config.redis_url)?) as _,
            ),
        ],
        start_time: Instant::now(),
    };

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
