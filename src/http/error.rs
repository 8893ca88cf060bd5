//! Mapping of [`AppError`] onto HTTP status codes and JSON bodies.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::application::{AppError, ErrorKind};

/// Result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, AppError>;

/// Error payload returned by every failing endpoint.
///
/// ```json
/// {"code": "insufficient_funds", "message": "Insufficient funds in wallet ..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation
        | ErrorKind::SelfTransfer
        | ErrorKind::CurrencyMismatch
        | ErrorKind::InsufficientFunds => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        status_for(self.kind())
    }

    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        let message = if kind == ErrorKind::Storage {
            // Do not leak store internals to clients.
            error!(error = ?self, "storage failure");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: kind.as_str().to_string(),
            message,
        })
    }
}
