use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use guildplan_libs::{BlockError, SessionError, StoreError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blocks(#[from] BlockError),
    #[error("Room `{0}` is not open")]
    NotOpen(String),
    #[error("Room registry lock is poisoned")]
    Poisoned,
    #[error("Blocking task was cancelled")]
    Blocking(#[from] BlockingError),
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::InvalidSlug(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Session(SessionError::UnknownPlayer(_)) => StatusCode::NOT_FOUND,
            ApiError::Session(SessionError::Store(e)) | ApiError::Store(e) => store_status(e),
            ApiError::Session(_) | ApiError::Blocks(_) => StatusCode::BAD_REQUEST,
            ApiError::NotOpen(_) | ApiError::Poisoned | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
