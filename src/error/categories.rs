use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    // Client errors
    ValidationError,
    AuthenticationError,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    RateLimited,

    // Payment flow errors
    InsufficientBudget,
    PaymentFailed,
    InvoiceError,
    WithdrawalCooldown,

    // System errors
    DatabaseError,
    InternalError,
    ServiceUnavailable,
}

impl ErrorCategory {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::AuthenticationError => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InsufficientBudget => StatusCode::FORBIDDEN,
            Self::PaymentFailed => StatusCode::BAD_REQUEST,
            Self::InvoiceError => StatusCode::FORBIDDEN,
            Self::WithdrawalCooldown => StatusCode::UNAUTHORIZED,
            Self::DatabaseError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationError => "AUTH_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::NotAcceptable => "NOT_ACCEPTABLE",
            Self::RateLimited => "RATE_LIMITED",
            Self::InsufficientBudget => "INSUFFICIENT_BUDGET",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::InvoiceError => "INVOICE_ERROR",
            Self::WithdrawalCooldown => "WITHDRAWAL_COOLDOWN",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Payment-flow rejections render as `{"success": false, "error": …}`,
    /// the envelope the bounty frontend expects. Everything else uses the
    /// structured error envelope.
    pub fn uses_failure_envelope(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBudget
                | Self::PaymentFailed
                | Self::InvoiceError
                | Self::WithdrawalCooldown
        )
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError
                | Self::AuthenticationError
                | Self::NotFound
                | Self::MethodNotAllowed
                | Self::NotAcceptable
                | Self::RateLimited
                | Self::InsufficientBudget
                | Self::PaymentFailed
                | Self::InvoiceError
                | Self::WithdrawalCooldown
        )
    }

    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error_code())
    }
}
