use std::time::Duration;

use futures::{StreamExt as _, TryStreamExt as _};
use moviedb_types::{validator, Runtime, Validator};
use serde::{Deserialize, Serialize};
use sqlx::Row as _;
use tracing::debug;

use crate::{bounded, error::Result, ChosenRow, Error, ListingParams, DEFAULT_QUERY_TIMEOUT};

pub const VALID_ORDER_FIELDS: &[&str] = &["id", "title", "year", "runtime"];

pub const MIN_YEAR: i32 = 1888;
pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_GENRES: usize = 5;

const SELECT_COLUMNS: &str = "id, created_at, title, year, runtime, genres, version";
const FILTER_CLAUSE: &str = r#"
    (? = '' OR instr(lower(title), lower(?)) > 0)
    AND NOT EXISTS (
        SELECT 1 FROM json_each(?) AS wanted
        WHERE wanted.value NOT IN (SELECT value FROM json_each(movie.genres))
    )
"#;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: time::PrimitiveDateTime,
    pub title: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub version: i64,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let genres: String = row.try_get("genres")?;
        let genres = serde_json::from_str(&genres).map_err(|e| sqlx::Error::ColumnDecode {
            index: "genres".to_string(),
            source: Box::new(e),
        })?;
        Ok(Movie {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            runtime: Runtime::new(row.try_get("runtime")?),
            genres,
            version: row.try_get("version")?,
        })
    }
}

/// Payload for a new movie. Missing fields stay at zero values and are
/// reported by validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMovie {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Option<Vec<String>>,
}

/// Partial update, `None` leaves the stored value unchanged.
///
/// `version`, when sent, is the version the client expects the record to
/// be at.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovie {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub runtime: Option<Runtime>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl UpdateMovie {
    pub fn apply_to(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = runtime;
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
        if let Some(version) = self.version {
            movie.version = version;
        }
    }
}

/// Fields checked by [`validate_movie`], shared by stored records and new
/// payloads.
pub trait MovieFields {
    fn title(&self) -> &str;
    fn year(&self) -> i32;
    fn runtime(&self) -> Runtime;
    /// `None` means genres were not provided at all.
    fn genres(&self) -> Option<&[String]>;
}

impl MovieFields for Movie {
    fn title(&self) -> &str {
        &self.title
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn runtime(&self) -> Runtime {
        self.runtime
    }
    fn genres(&self) -> Option<&[String]> {
        Some(&self.genres)
    }
}

impl MovieFields for CreateMovie {
    fn title(&self) -> &str {
        &self.title
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn runtime(&self) -> Runtime {
        self.runtime
    }
    fn genres(&self) -> Option<&[String]> {
        self.genres.as_deref()
    }
}

pub fn validate_movie<M: MovieFields + ?Sized>(v: &mut Validator, movie: &M) {
    let title = movie.title();
    v.check(!title.is_empty(), "title", "must be provided");
    v.check(
        title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    let year = movie.year();
    let current_year = time::OffsetDateTime::now_utc().year();
    v.check(year != 0, "year", "must be provided");
    v.check(year >= MIN_YEAR, "year", "must be greater than 1888");
    v.check(year <= current_year, "year", "must not be in the future");

    let runtime = movie.runtime();
    v.check(!runtime.is_zero(), "runtime", "must be provided");
    v.check(runtime.minutes() > 0, "runtime", "must be a positive integer");

    let genres = movie.genres();
    v.check(genres.is_some(), "genres", "must be provided");
    let genres = genres.unwrap_or_default();
    v.check(!genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        validator::unique(genres),
        "genres",
        "must not contain duplicate values",
    );
}

/// Title and genre constraints of a listing.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Case-insensitive substring of the title, empty matches all.
    ///
    /// Matching uses SQLite `lower()`, which only folds ASCII letters, so
    /// `"ÉTÉ"` does not match `"été"`.
    pub title: String,
    /// Movie must have all of these genres, empty matches all.
    pub genres: Vec<String>,
}

pub type MovieRepository = MovieRepositoryImpl<crate::Pool>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn create(&self, payload: &CreateMovie) -> Result<Movie> {
        let genres = payload.genres.clone().unwrap_or_default();
        let encoded_genres = serde_json::to_string(&genres)?;
        bounded(self.timeout, async {
            let (id, created_at, version): (i64, time::PrimitiveDateTime, i64) = sqlx::query_as(
                "INSERT INTO movie (title, year, runtime, genres, version) VALUES (?, ?, ?, ?, 1) \
                 RETURNING id, created_at, version",
            )
            .bind(&payload.title)
            .bind(payload.year)
            .bind(payload.runtime.minutes())
            .bind(&encoded_genres)
            .fetch_one(&self.executor)
            .await?;
            debug!("Created movie {id}");

            Ok(Movie {
                id,
                created_at,
                title: payload.title.clone(),
                year: payload.year,
                runtime: payload.runtime,
                genres,
                version,
            })
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(Error::RecordNotFound(format!("movie {id}")));
        }
        bounded(self.timeout, async {
            sqlx::query_as::<_, Movie>(&format!(
                "SELECT {SELECT_COLUMNS} FROM movie WHERE id = ?"
            ))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("movie {id}")))
        })
        .await
    }

    /// Writes `movie` only if the stored record is still at `movie.version`.
    ///
    /// Returns the record with its new version. A missing record or a stale
    /// version both end in [`Error::EditConflict`]; nothing is retried.
    pub async fn update(&self, movie: &Movie) -> Result<Movie> {
        let encoded_genres = serde_json::to_string(&movie.genres)?;
        bounded(self.timeout, async {
            let new_version: Option<i64> = sqlx::query_scalar(
                "UPDATE movie SET title = ?, year = ?, runtime = ?, genres = ?, version = version + 1 \
                 WHERE id = ? AND version = ? RETURNING version",
            )
            .bind(&movie.title)
            .bind(movie.year)
            .bind(movie.runtime.minutes())
            .bind(&encoded_genres)
            .bind(movie.id)
            .bind(movie.version)
            .fetch_optional(&self.executor)
            .await?;

            match new_version {
                Some(version) => Ok(Movie {
                    version,
                    ..movie.clone()
                }),
                None => {
                    debug!("Update of movie {} at version {} conflicted", movie.id, movie.version);
                    Err(Error::EditConflict {
                        id: movie.id,
                        version: movie.version,
                    })
                }
            }
        })
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(Error::RecordNotFound(format!("movie {id}")));
        }
        bounded(self.timeout, async {
            let res = sqlx::query("DELETE FROM movie WHERE id = ?")
                .bind(id)
                .execute(&self.executor)
                .await?;

            if res.rows_affected() == 0 {
                Err(Error::RecordNotFound(format!("movie {id}")))
            } else {
                Ok(())
            }
        })
        .await
    }

    pub async fn count(&self, filter: &MovieFilter) -> Result<u64> {
        let wanted_genres = serde_json::to_string(&filter.genres)?;
        bounded(self.timeout, async {
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT count(*) FROM movie WHERE {FILTER_CLAUSE}"))
                    .bind(&filter.title)
                    .bind(&filter.title)
                    .bind(&wanted_genres)
                    .fetch_one(&self.executor)
                    .await?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    pub async fn list(&self, filter: &MovieFilter, params: &ListingParams) -> Result<Vec<Movie>> {
        let order = params.ordering(VALID_ORDER_FIELDS)?;
        let order = if order.is_empty() {
            "id ASC".to_string()
        } else {
            format!("{order}, id ASC")
        };
        let wanted_genres = serde_json::to_string(&filter.genres)?;
        bounded(self.timeout, async {
            let records = sqlx::query_as::<_, Movie>(&format!(
                "SELECT {SELECT_COLUMNS} FROM movie WHERE {FILTER_CLAUSE} ORDER BY {order} LIMIT ? OFFSET ?"
            ))
            .bind(&filter.title)
            .bind(&filter.title)
            .bind(&wanted_genres)
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
            Ok(records)
        })
        .await
    }
}
