use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::Json;
use http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// JSON request body; any decoding failure is a 400 with a JSON error body.
///
/// Payloads are expected to reject unknown fields themselves
/// (`#[serde(deny_unknown_fields)]`). Trailing content after the JSON value
/// is always rejected and the size limit comes from the router's
/// `DefaultBodyLimit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                debug!("Rejected request body: {rejection}");
                Err(ApiError::BadRequest(body_error_message(&rejection)))
            }
        }
    }
}

fn body_error_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(e) => format!("body contains invalid data: {}", e.body_text()),
        JsonRejection::JsonSyntaxError(e) => {
            format!("body contains badly-formed JSON: {}", e.body_text())
        }
        JsonRejection::MissingJsonContentType(_) => {
            "request must have Content-Type: application/json".to_string()
        }
        other => other.body_text(),
    }
}

/// Record id from the `{id}` path segment.
///
/// Anything that is not a positive integer cannot name a record, so it is
/// rejected as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;
        parse_id(&raw).map(RecordId).ok_or(ApiError::NotFound)
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("1.5"), None);
    }
}
