use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;
use thiserror::Error;

use std::io;
use std::sync::PoisonError;

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    Lock(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl InternalError {
    pub fn validation(what: impl Into<String>) -> InternalError {
        InternalError::Validation(what.into())
    }

    pub fn status(&self) -> Status {
        match self {
            InternalError::Validation(_) => Status::BadRequest,
            InternalError::NotFound(_) => Status::NotFound,
            _ => Status::InternalServerError,
        }
    }
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::Lock(e.to_string())
    }
}

impl<'r> Responder<'r, 'static> for InternalError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            tracing::error!(error = %self, uri = %request.uri(), "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).respond_to(request)
    }
}

pub type InternalResult<T> = Result<T, InternalError>;
