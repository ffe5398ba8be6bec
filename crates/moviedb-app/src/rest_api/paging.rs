use axum::extract::{FromRequestParts, Query};
use garde::Validate;
use http::request::Parts;
use moviedb_dal::{movie::MovieFilter, ListingParams, Order};
use moviedb_types::validator::permitted_value;
use moviedb_types::{ValidationErrors, Validator};
use tracing::debug;

use crate::error::ApiError;

pub const DEFAULT_SORT: &str = "id";

/// Sort values a listing accepts, `-` prefix means descending.
#[derive(Debug, Clone, Copy)]
pub struct SortSafelist(pub &'static [&'static str]);

/// Raw listing query, values are parsed and validated by [`ListQuery::parse`].
///
/// Only the first value of a repeated key counts, unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    title: Option<String>,
    genres: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[garde(context(SortSafelist))]
pub struct Paging {
    #[garde(range(min = 1, max = 10_000_000))]
    pub page: i64,
    #[garde(range(min = 1, max = 100))]
    pub page_size: i64,
    #[garde(custom(permitted_sort))]
    pub sort: String,
}

fn permitted_sort(value: &str, safelist: &SortSafelist) -> garde::Result {
    if permitted_value(&value, safelist.0) {
        Ok(())
    } else {
        Err(garde::Error::new("invalid sort value"))
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!("Rejected query string: {rejection}");
                ApiError::BadRequest(rejection.body_text())
            })?;
        Ok(ListQuery::from_pairs(pairs))
    }
}

impl ListQuery {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = ListQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "title" => &mut query.title,
                "genres" => &mut query.genres,
                "page" => &mut query.page,
                "page_size" => &mut query.page_size,
                "sort" => &mut query.sort,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    /// Reads title and genres filter and paging, collecting every problem
    /// before returning.
    pub fn parse(
        self,
        default_page_size: u32,
        safelist: &SortSafelist,
    ) -> Result<(MovieFilter, Paging), ValidationErrors> {
        let mut v = Validator::new();

        let filter = MovieFilter {
            title: non_empty(self.title).unwrap_or_default(),
            genres: non_empty(self.genres)
                .map(|csv| csv.split(',').map(|g| g.trim().to_string()).collect())
                .unwrap_or_default(),
        };

        let paging = Paging {
            page: read_int(self.page, "page", 1, &mut v),
            page_size: read_int(
                self.page_size,
                "page_size",
                default_page_size.into(),
                &mut v,
            ),
            sort: non_empty(self.sort).unwrap_or_else(|| DEFAULT_SORT.to_string()),
        };

        if let Err(report) = paging.validate_with(safelist) {
            v.absorb(report);
        }
        v.into_result()?;
        Ok((filter, paging))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn read_int(value: Option<String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match non_empty(value) {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

impl Paging {
    pub fn listing_params(&self) -> ListingParams {
        let offset = (self.page - 1) * self.page_size;
        let order = match self.sort.strip_prefix('-') {
            Some(field) => Order::Desc(field.to_string()),
            None => Order::Asc(self.sort.clone()),
        };
        ListingParams::new(offset, self.page_size).with_order(vec![order])
    }
}
