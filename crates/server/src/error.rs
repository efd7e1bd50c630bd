use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{board::BoardError, drag_monitor::DragPayloadError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    DragPayload(#[from] DragPayloadError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Board(BoardError::FetchFailed(_)) => StatusCode::BAD_GATEWAY,
            Self::Board(BoardError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DragPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Backend details stay in the logs.
            Self::Board(BoardError::FetchFailed(_)) => {
                services::services::data_store::FETCH_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        tracing::warn!(status = %status, error = %self, "Request failed");

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
