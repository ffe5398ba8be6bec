use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use axum::{extract::DefaultBodyLimit, Router};
use futures::FutureExt;
use moviedb_app::error::not_found;
use moviedb_app::state::AppState;
use moviedb_dal::PoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

const DATABASE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if !args.no_cors {
        app = app.layer(CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting {} server on {}", args.env, listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    debug!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    let body_limit = state.config().body_limit;
    moviedb_app::rest_api::router()
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.database.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {data_dir:?}");
    }

    let options = PoolOptions {
        max_connections: config.database.db_max_connections,
        idle_timeout: Some(config.database.db_max_idle_time),
    };
    let pool = tokio::time::timeout(
        DATABASE_CONNECT_TIMEOUT,
        moviedb_dal::new_pool_with_options(&config.database.database_url(), options),
    )
    .await
    .map_err(|_| Error::DatabaseUnavailable(DATABASE_CONNECT_TIMEOUT))??;
    moviedb_dal::ensure_schema(&pool).await?;
    info!("Database connection pool established");

    Ok(AppState::new(config.into(), pool))
}
