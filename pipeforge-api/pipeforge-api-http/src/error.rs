//! Maps the core error taxonomy onto HTTP statuses at the API
//! boundary; the core itself never decides status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use pipeforge_common::error::Error;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Parameter(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::TemplateConflict { .. } => StatusCode::CONFLICT,
        Error::PluginCrashed { .. } => StatusCode::BAD_GATEWAY,
        Error::PluginTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::UpstreamHttp { status } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }

        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
