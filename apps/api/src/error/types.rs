use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl ErrorResponse {
    pub(super) fn new(error: &'static str, message: String) -> Self {
        Self { error, message }
    }
}
