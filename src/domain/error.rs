//! Banking Error Types
//!
//! The single discriminated error returned by every orchestrator operation.
//! Validation failures, business rule violations and wrapped infrastructure
//! failures are all variants of [`BankingError`], each with a stable machine code.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountSide;

/// Banking domain errors
#[derive(Debug, Error)]
pub enum BankingError {
    /// Malformed input caught before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A named field failed validation
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// One side of the transfer does not exist
    #[error("{side} account not found: {account_id}")]
    AccountNotFound {
        side: AccountSide,
        account_id: String,
    },

    /// Balance does not cover amount plus fee
    #[error("Insufficient funds. Available: {available}, Required: {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    /// A category, batch or amount ceiling was exceeded
    #[error("{limit_type} limit exceeded. Maximum: {limit}, Attempted: {attempted}")]
    LimitExceeded {
        limit_type: String,
        limit: Decimal,
        attempted: Decimal,
    },

    /// The operation is forbidden in the current state
    #[error("{message}")]
    NotAllowed {
        code: Option<&'static str>,
        message: String,
    },

    /// Coded banking error not covered by the variants above
    #[error("{message}")]
    Banking { code: &'static str, message: String },

    /// Infrastructure failure wrapped with its cause
    #[error("{message}")]
    Unexpected {
        code: &'static str,
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BankingError {
    /// Create a validation error for a field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create an insufficient funds error
    pub fn insufficient_funds(available: Decimal, required: Decimal) -> Self {
        Self::InsufficientFunds {
            available,
            required,
        }
    }

    /// Create a limit exceeded error
    pub fn limit_exceeded(limit_type: impl Into<String>, limit: Decimal, attempted: Decimal) -> Self {
        Self::LimitExceeded {
            limit_type: limit_type.into(),
            limit,
            attempted,
        }
    }

    /// Create a not-allowed error without a specific machine code
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::NotAllowed {
            code: None,
            message: message.into(),
        }
    }

    /// Create a not-allowed error carrying a machine code (e.g. `ACCOUNT_BLOCKED`)
    pub fn not_allowed_with_code(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotAllowed {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Create a generic coded banking error
    pub fn banking(code: &'static str, message: impl Into<String>) -> Self {
        Self::Banking {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            Self::NotAllowed { code, .. } => code.unwrap_or("TRANSACTION_NOT_ALLOWED"),
            Self::Banking { code, .. } => code,
            Self::Unexpected { code, .. } => code,
        }
    }

    /// Whether this error originates from a business rule rather than infrastructure
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Unexpected { .. })
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::Validation { .. }
                | Self::InsufficientFunds { .. }
                | Self::LimitExceeded { .. }
                | Self::NotAllowed { .. }
        )
    }
}
