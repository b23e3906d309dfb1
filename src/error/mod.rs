use std::fmt;

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

pub mod categories;

pub use categories::ErrorCategory;

use crate::observability::correlation::RequestContext;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub request_context: Option<RequestContext>,
}

impl AppError {
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.request_context = Some(context);
        self
    }

    // Convenience constructors for common error types
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::ValidationError, message)
    }

    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::AuthenticationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::MethodNotAllowed, message)
    }

    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::NotAcceptable, message)
    }

    pub fn insufficient_budget(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::InsufficientBudget, message)
    }

    pub fn payment_failed(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::PaymentFailed, message)
    }

    pub fn invoice_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::InvoiceError, message)
    }

    pub fn withdrawal_cooldown(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::WithdrawalCooldown, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::DatabaseError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::InternalError, message)
    }

    pub fn with_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            details: None,
            source: None,
            request_context: None,
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.category.status_code();

        // Log error with full context
        if status.is_server_error() {
            error!(
                category = ?self.category,
                code = self.category.error_code(),
                message = %self.message,
                details = ?self.details,
                source = ?self.source,
                correlation_id = self.request_context.as_ref().map(|c| &c.correlation_id),
                request_id = self.request_context.as_ref().map(|c| &c.request_id),
                "Internal server error"
            );
        } else if status.is_client_error() {
            warn!(
                category = ?self.category,
                code = self.category.error_code(),
                message = %self.message,
                details = ?self.details,
                correlation_id = self.request_context.as_ref().map(|c| &c.correlation_id),
                request_id = self.request_context.as_ref().map(|c| &c.request_id),
                "Client error"
            );
        }

        let body = if self.category.uses_failure_envelope() {
            json!({
                "success": false,
                "error": self.message,
            })
        } else {
            json!({
                "error": {
                    "code": self.category.error_code(),
                    "message": self.message,
                    "details": self.details,
                    "correlation_id": self.request_context.as_ref().map(|c| &c.correlation_id),
                    "request_id": self.request_context.as_ref().map(|c| &c.request_id),
                }
            })
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// Convert anyhow::Error to AppError at the edges
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // anyhow::Error already contains the full error chain, so we just use its
        // string representation
        Self::internal_error(err.to_string())
    }
}

// Malformed request bodies reject with 406, matching the withdrawal contract
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::not_acceptable(format!("JSON parsing error: {}", err)).with_source(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::payment_failed(err.to_string())
    }
}
