use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::{Method, StatusCode};
use moviedb_types::ValidationErrors;
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process the request";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Data layer error: {0}")]
    DalError(moviedb_dal::Error),
}

impl From<moviedb_dal::Error> for ApiError {
    fn from(err: moviedb_dal::Error) -> Self {
        match err {
            moviedb_dal::Error::RecordNotFound(_) => ApiError::NotFound,
            moviedb_dal::Error::EditConflict { .. } => ApiError::EditConflict,
            moviedb_dal::Error::InvalidOrderByField(field) => {
                ApiError::BadRequest(format!("invalid sort field {field}"))
            }
            other => ApiError::DalError(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        let body = match self {
            ApiError::Validation(errors) => json!({ "error": errors }),
            ApiError::DalError(_) => json!({ "error": SERVER_ERROR_MESSAGE }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Router fallback for unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Router fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
