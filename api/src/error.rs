use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::Value;
use shared::validation::ValidationErrors;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can return, mapped onto an HTTP status and a
/// machine-readable `code`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid(code: &'static str, message: impl Into<String>, errors: ValidationErrors) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
            details: serde_json::to_value(&errors.0).ok(),
        }
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self::invalid("VALIDATION_ERROR", "Validation failed", errors)
    }

    pub fn invalid_query(errors: ValidationErrors) -> Self {
        Self::invalid("INVALID_QUERY_PARAMS", "Invalid query parameters", errors)
    }

    pub fn invalid_id() -> Self {
        Self::bad_request("INVALID_ID", "A positive numeric id is required")
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest { code, message, details } => ErrorBody {
                error: message,
                code: Some(*code),
                details: details.as_ref(),
            },
            ApiError::NotFound { code, message } | ApiError::Conflict { code, message } => ErrorBody {
                error: message,
                code: Some(*code),
                details: None,
            },
            ApiError::Database(e) => {
                error!(error = %e, "Database error while handling request");
                internal_body()
            }
            ApiError::Internal(e) => {
                error!(error = ?e, "Internal error while handling request");
                internal_body()
            }
        };
        (status, Json(body)).into_response()
    }
}

// Raw error text stays in the operational log.
fn internal_body() -> ErrorBody<'static> {
    ErrorBody {
        error: "Internal server error",
        code: Some("INTERNAL_ERROR"),
        details: None,
    }
}

/// Unwraps an optional-rejection JSON extractor into the raw body value.
pub fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::bad_request(
            "VALIDATION_ERROR",
            format!("Invalid JSON body: {}", rejection.body_text()),
        )),
    }
}

pub fn query_rejected(code: &'static str, rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(code, format!("Invalid query string: {}", rejection.body_text()))
}
