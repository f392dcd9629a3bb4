use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chainaudit_application::PipelineFailure;
use chainaudit_core::AppError;
use chainaudit_infrastructure::CHAIN_INTEGRITY_ERROR;

use crate::dto::{EventSubmissionFailureResponse, MissingFieldsResponse};

mod types;

use types::ErrorResponse;

const MISSING_FIELDS_ERROR: &str = "Missing required fields";
const PIPELINE_FAILURE_ERROR: &str = "Event processing failed";

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let AppError::InvalidFields(required) = self.0 {
            return (
                StatusCode::BAD_REQUEST,
                Json(MissingFieldsResponse {
                    error: MISSING_FIELDS_ERROR,
                    required,
                }),
            )
                .into_response();
        }

        let (status, error) = status_and_title(&self.0);
        let payload = Json(ErrorResponse::new(error, self.0.to_string()));

        (status, payload).into_response()
    }
}

fn status_and_title(error: &AppError) -> (StatusCode, &'static str) {
    match error {
        AppError::InvalidFields(_) => (StatusCode::BAD_REQUEST, MISSING_FIELDS_ERROR),
        AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        AppError::DuplicateEvent(_) => (StatusCode::CONFLICT, "Duplicate event"),
        AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
        AppError::ChainIntegrity(_) => (StatusCode::SERVICE_UNAVAILABLE, CHAIN_INTEGRITY_ERROR),
        AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "Too many requests"),
        AppError::TransientStorage(_)
        | AppError::DownstreamUnavailable(_)
        | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}

/// Error returned by `POST /events`.
///
/// Missing fields render like [`ApiError`]; every other failure carries the
/// attempt count and the last stage error.
#[derive(Debug)]
pub struct EventSubmissionError(pub PipelineFailure);

impl IntoResponse for EventSubmissionError {
    fn into_response(self) -> Response {
        match failure_body(self.0) {
            Ok((status, body)) => (status, Json(body)).into_response(),
            Err(error) => ApiError(error).into_response(),
        }
    }
}

fn failure_body(
    failure: PipelineFailure,
) -> Result<(StatusCode, EventSubmissionFailureResponse), AppError> {
    let PipelineFailure {
        error,
        attempts,
        last_error,
    } = failure;

    if matches!(error, AppError::InvalidFields(_)) {
        return Err(error);
    }

    let (status, title) = status_and_title(&error);
    let title = if status == StatusCode::INTERNAL_SERVER_ERROR {
        PIPELINE_FAILURE_ERROR
    } else {
        title
    };

    Ok((
        status,
        EventSubmissionFailureResponse {
            success: false,
            error: title,
            message: error.to_string(),
            attempts,
            last_error,
        },
    ))
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
