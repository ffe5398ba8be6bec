pub mod movie;
pub mod paging;

use std::collections::BTreeMap;

use axum::Json;

pub use paging::{ListQuery, Paging, SortSafelist};

/// Wraps a response payload in a single-key JSON object.
pub fn envelope<T: serde::Serialize>(key: &'static str, value: T) -> Json<BTreeMap<&'static str, T>> {
    Json(BTreeMap::from([(key, value)]))
}

pub fn router() -> axum::Router<crate::state::AppState> {
    axum::Router::new()
        .route("/v1/healthcheck", axum::routing::get(crate::health::healthcheck))
        .nest("/v1/movies", movie::router())
        .method_not_allowed_fallback(crate::error::method_not_allowed)
}
