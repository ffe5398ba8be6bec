use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use moviedb_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, error};

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Keeps the temporary data directory alive and stops the server when dropped.
pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "moviedb-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--db-query-timeout",
        "5s",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
            shutdown: None,
        },
    ))
}

/// Config with a fresh data directory and an initialized database.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    let (config, guard) = test_config(test_name, &base_dir)?;
    let pool = moviedb_dal::new_pool(&config.database.database_url()).await?;
    moviedb_dal::ensure_schema(&pool).await?;
    pool.close().await;
    Ok((config, guard))
}

/// Starts the server and waits until its healthcheck answers.
pub async fn launch_env(args: ServerConfig, guard: &mut ConfigGuard) -> Result<reqwest::Client> {
    let state = moviedb_server::build_state(&args).await?;
    let base_url = args.base_url();
    let (tx, rx) = oneshot::channel::<()>();
    guard.shutdown = Some(tx);

    tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        if let Err(e) = moviedb_server::run_graceful_with_state(args, state, shutdown).await {
            error!("Test server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    let health_url = format!("{base_url}/v1/healthcheck");
    for _ in 0..50 {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => return Ok(client),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start at {base_url}"))
}

pub fn extend_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
