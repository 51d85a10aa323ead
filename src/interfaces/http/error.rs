use crate::error::LedgerError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Wraps [`LedgerError`] so handlers can return it with `?`.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidAmount(_) | LedgerError::InvalidLecture(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::AlreadyEnrolled { .. } | LedgerError::OrderExpired(_) => StatusCode::CONFLICT,
        LedgerError::OrderNotFound(_) | LedgerError::CourseNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::OrderMismatch(_)
        | LedgerError::SignatureInvalid(_)
        | LedgerError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
        LedgerError::NotEnrolled { .. } => StatusCode::FORBIDDEN,
        LedgerError::Gateway(_) => StatusCode::BAD_GATEWAY,
        LedgerError::InvalidTransition(_) | LedgerError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
