use axum::http::StatusCode;

/// Error returned to HTTP clients as a plain-text body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }

    /// A page switch such as `?dev=` or `?mock=` outside `0`/`1`.
    pub fn invalid_switch(name: &str, value: u8) -> Self {
        Self::bad_request(format!("{name} must be 0 or 1, got {value}"))
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(status = %self.status, message = %self.message, "request rejected");
        (self.status, self.message).into_response()
    }
}
