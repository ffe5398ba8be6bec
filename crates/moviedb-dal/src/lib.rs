pub mod error;
pub mod movie;

use std::{fmt::Display, future::Future, str::FromStr, time::Duration};

pub use error::Error;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

pub const MAX_LIMIT: usize = 10_000;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS movie (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    title TEXT NOT NULL,
    year INTEGER NOT NULL,
    runtime INTEGER NOT NULL,
    genres TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 1
)
"#;

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            idle_timeout: Some(Duration::from_secs(15 * 60)),
        }
    }
}

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    new_pool_with_options(database_url, PoolOptions::default()).await
}

pub async fn new_pool_with_options(database_url: &str, options: PoolOptions) -> Result<Pool> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .idle_timeout(options.idle_timeout)
        .connect_with(connect_options)
        .await?;
    Ok(pool)
}

/// Creates the movie table if it does not exist yet.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Runs a database operation within `budget`.
///
/// When the budget runs out the operation future is dropped, which cancels
/// the in-flight query.
pub(crate) async fn bounded<F, T>(budget: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, operation).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Database operation cancelled after {budget:?}");
            Err(Error::Timeout(budget))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{} ASC", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub offset: i64,
    pub limit: i64,
    pub order: Option<Vec<Order>>,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: MAX_LIMIT as i64,
            order: None,
        }
    }
}

impl ListingParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset,
            limit,
            order: None,
        }
    }

    pub fn with_order(mut self, order: Vec<Order>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn ordering(&self, valid_fields: &[&str]) -> Result<String> {
        let ordering = self
            .order
            .as_ref()
            .map(|o| {
                o.iter()
                    .map(|o| {
                        if valid_fields.contains(&o.as_ref()) {
                            Ok(o.to_string())
                        } else {
                            Err(Error::InvalidOrderByField(o.as_ref().to_string()))
                        }
                    })
                    .collect::<Result<Vec<String>>>()
                    .map(|o| o.join(", "))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(ordering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let params = ListingParams::new(0, 10).with_order(vec![
            Order::Desc("year".to_string()),
            Order::Asc("title".to_string()),
        ]);
        assert_eq!(
            params.ordering(&["id", "title", "year"]).unwrap(),
            "year DESC, title ASC"
        );
        assert_eq!(ListingParams::default().ordering(&["id"]).unwrap(), "");
    }

    #[test]
    fn test_ordering_rejects_unknown_field() {
        let params = ListingParams::default().with_order(vec![Order::Asc(
            "title; DROP TABLE movie".to_string(),
        )]);
        assert!(matches!(
            params.ordering(&["id", "title"]),
            Err(Error::InvalidOrderByField(_))
        ));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let budget = Duration::from_millis(10);
        let res: Result<()> = bounded(budget, futures::future::pending()).await;
        assert!(matches!(res, Err(Error::Timeout(d)) if d == budget));
    }

    #[tokio::test]
    async fn test_bounded_passes_result() {
        let res = bounded(DEFAULT_QUERY_TIMEOUT, async { Ok(42) }).await;
        assert_eq!(res.unwrap(), 42);

        let res: Result<()> = bounded(DEFAULT_QUERY_TIMEOUT, async {
            Err(Error::RecordNotFound("movie 1".to_string()))
        })
        .await;
        assert!(matches!(res, Err(Error::RecordNotFound(_))));
    }
}
