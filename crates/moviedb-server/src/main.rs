use moviedb_server::{
    config::ServerConfig,
    error::{Error, Result},
    run,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match ServerConfig::load() {
        Ok(args) => args,
        Err(Error::Config(e)) => e.exit(),
        Err(e) => return Err(e),
    };
    run(args).await
}
