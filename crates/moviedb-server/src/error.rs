pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] clap::Error),

    #[error("Invalid listen address: {0}")]
    ListenAddress(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] moviedb_dal::Error),

    #[error("Database did not respond within {0:?}")]
    DatabaseUnavailable(std::time::Duration),
}
