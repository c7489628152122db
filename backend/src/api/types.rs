//! REST API types.
//!
//! Successful conversions return the [`ConversionDocument`] itself; failures
//! return `{"detail": "..."}` with a 4xx/5xx status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ServerError, SheetError};

/// Error body of the API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}

/// HTTP status for a server error.
pub fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Convert(ConvertError::Sheet(SheetError::Unreadable(_))) => {
            StatusCode::BAD_REQUEST
        }
        ServerError::Convert(ConvertError::Sheet(_)) => StatusCode::NOT_FOUND,
        ServerError::Convert(ConvertError::Transform(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Convert(ConvertError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (status_for(&self), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
