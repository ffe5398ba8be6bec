pub use clap::Parser;
use moviedb_app::state::AppConfig;
use moviedb_types::config::{DatabaseConfig, Environment};

use crate::error::Result;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "MOVIEDB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "MOVIEDB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        value_enum,
        default_value_t = Environment::Development,
        env = "MOVIEDB_ENV",
        help = "Environment the server runs in"
    )]
    pub env: Environment,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[arg(
        long,
        env = "MOVIEDB_BODY_LIMIT_KB",
        default_value = "1024",
        help = "Maximum size of request body in KiB"
    )]
    pub body_limit_kb: usize,

    #[arg(
        long,
        env = "MOVIEDB_DEFAULT_PAGE_SIZE",
        default_value = "20",
        help = "Default page size of listings"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "MOVIEDB_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.listen_address, self.port)
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            env: config.env,
            query_timeout: config.database.db_query_timeout,
            default_page_size: config.default_page_size,
            body_limit: config.body_limit_kb * 1024,
        }
    }
}
