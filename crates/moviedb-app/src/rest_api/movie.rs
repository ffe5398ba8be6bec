use moviedb_dal::movie::MovieRepository;

use crate::state::AppState;
use axum::routing::get;

crate::repository_from_request!(MovieRepository);

/// Sort values accepted by the movie listing.
pub const SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

mod crud_api {
    use super::*;
    use crate::error::ApiResult;
    use crate::extract::{JsonBody, RecordId};
    use crate::rest_api::{envelope, ListQuery, SortSafelist};
    use axum::{
        extract::State,
        response::IntoResponse,
    };
    use http::{header, StatusCode};
    use moviedb_dal::movie::{validate_movie, CreateMovie, UpdateMovie};
    use moviedb_types::Validator;
    use tracing::debug;

    pub async fn create(
        repository: MovieRepository,
        JsonBody(payload): JsonBody<CreateMovie>,
    ) -> ApiResult<impl IntoResponse> {
        let mut v = Validator::new();
        validate_movie(&mut v, &payload);
        v.into_result()?;

        let record = repository.create(&payload).await?;
        let location = format!("/v1/movies/{}", record.id);

        Ok((
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            envelope("movie", record),
        ))
    }

    pub async fn get(
        RecordId(id): RecordId,
        repository: MovieRepository,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(id).await?;

        Ok((StatusCode::OK, envelope("movie", record)))
    }

    pub async fn update(
        RecordId(id): RecordId,
        repository: MovieRepository,
        JsonBody(payload): JsonBody<UpdateMovie>,
    ) -> ApiResult<impl IntoResponse> {
        let mut record = repository.get(id).await?;
        payload.apply_to(&mut record);

        let mut v = Validator::new();
        validate_movie(&mut v, &record);
        v.into_result()?;

        let record = repository.update(&record).await?;

        Ok((StatusCode::OK, envelope("movie", record)))
    }

    pub async fn delete(
        RecordId(id): RecordId,
        repository: MovieRepository,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete(id).await?;

        Ok((
            StatusCode::OK,
            envelope("message", "movie successfully deleted"),
        ))
    }

    pub async fn list(
        repository: MovieRepository,
        State(state): State<AppState>,
        query: ListQuery,
    ) -> ApiResult<impl IntoResponse> {
        let (filter, paging) = query.parse(
            state.config().default_page_size,
            &SortSafelist(SORT_SAFELIST),
        )?;
        debug!("Listing movies with {filter:?} and {paging:?}");
        let records = repository.list(&filter, &paging.listing_params()).await?;

        Ok((StatusCode::OK, envelope("movies", records)))
    }

    pub async fn count(
        repository: MovieRepository,
        State(state): State<AppState>,
        query: ListQuery,
    ) -> ApiResult<impl IntoResponse> {
        let (filter, _) = query.parse(
            state.config().default_page_size,
            &SortSafelist(SORT_SAFELIST),
        )?;
        let count = repository.count(&filter).await?;

        Ok((StatusCode::OK, envelope("count", count)))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route("/count", get(crud_api::count))
        .route(
            "/{id}",
            get(crud_api::get)
                .patch(crud_api::update)
                .delete(crud_api::delete),
        )
}
