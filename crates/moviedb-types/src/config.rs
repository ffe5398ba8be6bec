use clap::{Args, ValueEnum};
use std::{fmt::Display, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    #[arg(
        long,
        env = "MOVIEDB_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/moviedb.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "MOVIEDB_DATA_DIR",
        help = "Data directory (database etc.), default is system default like ~/.local/share/moviedb",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "MOVIEDB_DB_MAX_CONNECTIONS",
        default_value_t = 5,
        help = "Maximum number of open database connections"
    )]
    pub db_max_connections: u32,

    #[arg(
        long,
        env = "MOVIEDB_DB_MAX_IDLE_TIME",
        default_value = "15m",
        help = "Idle database connections are closed after this time (e.g. 15m, 1h)",
        value_parser = humantime::parse_duration
    )]
    pub db_max_idle_time: Duration,

    #[arg(
        long,
        env = "MOVIEDB_DB_QUERY_TIMEOUT",
        default_value = "3s",
        help = "Time budget of a single database operation (e.g. 3s, 500ms)",
        value_parser = humantime::parse_duration
    )]
    pub db_query_timeout: Duration,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("moviedb"))
        .unwrap_or_else(|| PathBuf::from("moviedb"))
        .to_string_lossy()
        .to_string()
}

impl DatabaseConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/moviedb.db", self.data_dir))
    }
}
