use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use askama::Template;
use serde::Serialize;
use std::fmt;

use crate::workflow::StepKey;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Template(askama::Error),
    Hash(String),
    Session(String),
    PermissionDenied(String),
    Csrf,
    NotFound,
    /// A workflow step was requested before the steps preceding it.
    StepOutOfOrder { requested: StepKey, next: Option<StepKey> },
    /// Negative quantities, malformed dates and other rejected input.
    InvalidInput(String),
    Conflict(String),
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Template(e) => write!(f, "Template error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::PermissionDenied(code) => write!(f, "Permission denied: {code}"),
            AppError::Csrf => write!(f, "Invalid or missing CSRF token"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::StepOutOfOrder { requested, next } => match next {
                Some(next) => write!(
                    f,
                    "Step '{}' is not available yet: complete '{}' first",
                    requested.as_str(),
                    next.as_str()
                ),
                None => write!(f, "Step '{}' is not available", requested.as_str()),
            },
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Session(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) | AppError::Csrf => StatusCode::FORBIDDEN,
            AppError::StepOutOfOrder { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Db(_) | AppError::Template(_) | AppError::Hash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = if status.is_server_error() {
            log::error!("{self}");
            ApiErrorResponse { error: "Internal Server Error".to_string(), details: None }
        } else {
            if let AppError::PermissionDenied(code) = self {
                log::warn!("Permission denied: {code}");
            }
            ApiErrorResponse { error: self.to_string(), details: self.details() }
        };
        HttpResponse::build(status).json(body)
    }
}

impl AppError {
    /// Machine-readable hint for API clients (e.g. which step to complete first).
    fn details(&self) -> Option<String> {
        match self {
            AppError::StepOutOfOrder { next: Some(next), .. } => {
                Some(format!("next_step={}", next.as_str()))
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::Db(other),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

/// Render an Askama template into an HTML response.
pub fn render(tmpl: impl Template) -> Result<HttpResponse, AppError> {
    let html = tmpl.render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}
