pub mod correlation;
pub mod logging;
pub mod sanitization;

#[cfg(test)]
mod tests;

pub use correlation::{
    create_request_id_middleware, request_id_middleware, RateLimitConfig, RequestContext,
    CORRELATION_ID_HEADER, REQUEST_ID_HEADER,
};
pub use logging::{init_logging, LoggingConfig};
pub use sanitization::{
    sanitize_invoice, sanitize_payment_hash, sanitize_preimage, sanitize_pubkey,
    SanitizationConfig, SensitiveData, SensitiveDataType,
};
