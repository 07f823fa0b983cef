//! Error handling module
//!
//! HTTP-layer error type and response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::BankingError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Domain errors
    #[error(transparent)]
    Banking(#[from] BankingError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// HTTP status for a banking error
fn banking_status(err: &BankingError) -> StatusCode {
    match err {
        BankingError::InvalidArgument(_) | BankingError::Validation { .. } => StatusCode::BAD_REQUEST,
        BankingError::AccountNotFound { .. } => StatusCode::NOT_FOUND,
        BankingError::InsufficientFunds { .. }
        | BankingError::LimitExceeded { .. }
        | BankingError::NotAllowed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BankingError::Banking { code, .. } => match *code {
            "TRANSFER_NOT_FOUND" | "SCHEDULED_NOT_FOUND" => StatusCode::NOT_FOUND,
            "DEADLINE_EXCEEDED" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        },
        BankingError::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", Some(msg.clone()))
            }

            AppError::Banking(err) => {
                let status = banking_status(err);
                let details = match err {
                    BankingError::Validation { field, .. } => Some(format!("field: {}", field)),
                    BankingError::Unexpected { .. } => {
                        tracing::error!(error = ?err, "Unexpected banking error");
                        None
                    }
                    _ => None,
                };
                (status, err.code(), details)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountSide;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(BankingError::InvalidArgument("bad".into()), StatusCode::BAD_REQUEST)]
    #[case(BankingError::validation("amount", "bad"), StatusCode::BAD_REQUEST)]
    #[case(
        BankingError::AccountNotFound { side: AccountSide::Source, account_id: "1".into() },
        StatusCode::NOT_FOUND
    )]
    #[case(BankingError::insufficient_funds(dec!(1), dec!(2)), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(BankingError::not_allowed("no"), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(BankingError::banking("TRANSFER_NOT_FOUND", "gone"), StatusCode::NOT_FOUND)]
    #[case(BankingError::banking("DEADLINE_EXCEEDED", "late"), StatusCode::GATEWAY_TIMEOUT)]
    fn test_banking_status(#[case] err: BankingError, #[case] expected: StatusCode) {
        assert_eq!(banking_status(&err), expected);
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::from(BankingError::insufficient_funds(dec!(2000), dec!(3000)))
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = AppError::InvalidRequest("bad amount".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
