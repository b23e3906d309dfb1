//! Lightning gateway clients. Two backends exist: the v1 relay node and the
//! v2 payment bot. Which one a deployment talks to is fixed at startup from
//! configuration, never per request.
//!
//! Payment sends never return an error: whatever the gateway or the network
//! does, the caller gets a [`PaymentOutcome`] and decides refunds from it.
//! Only invoice creation and settlement checks surface typed errors.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;

pub mod bot;
pub mod relay;

pub use bot::BotGateway;
pub use relay::RelayGateway;

/// Unified result of a gateway send or settlement check.
///
/// `success` means the gateway accepted the operation; `settled` means funds
/// verifiably moved. A v2 send can be accepted but unsettled, in which case
/// `tag` carries the gateway identifier used to poll it later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub success: bool,
    pub settled: bool,
    pub payment_request: String,
    pub payment_hash: String,
    pub preimage: String,
    /// Decoded amount as reported by the gateway. Informational only; budget
    /// arithmetic always uses locally stored amounts.
    pub amount: String,
    pub tag: String,
    pub error: String,
}

impl PaymentOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    /// Accepted by the gateway but not yet settled.
    pub fn is_pending(&self) -> bool {
        self.success && !self.settled
    }
}

impl From<PaymentOutcome> for crate::types::InvoiceDetails {
    fn from(outcome: PaymentOutcome) -> Self {
        Self {
            settled: outcome.settled,
            payment_request: outcome.payment_request,
            payment_hash: outcome.payment_hash,
            preimage: outcome.preimage,
            amount: outcome.amount,
        }
    }
}

/// Status of an in-flight v2 payment identified by tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTagStatus {
    Complete,
    Pending,
    Failed { error: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pay a bolt11 invoice. Infallible by contract; failures are carried in
    /// the outcome.
    async fn pay_invoice(&self, bolt11: &str) -> PaymentOutcome;

    /// Send a keysend payment to a node pubkey. Infallible by contract.
    async fn keysend(
        &self,
        destination: &str,
        route_hint: &str,
        amount_sat: u64,
        memo: &str,
    ) -> PaymentOutcome;

    /// Create an invoice for the given amount, returning the bolt11 string.
    async fn create_invoice(&self, amount_sat: u64, memo: &str) -> Result<String, AppError>;

    /// Check whether an invoice has been settled.
    async fn check_invoice(&self, payment_request: &str) -> Result<PaymentOutcome, AppError>;

    /// Check the status of an in-flight payment by its gateway tag.
    async fn check_payment(&self, tag: &str) -> Result<PaymentTagStatus, AppError>;
}

/// Build the gateway selected by configuration. The v2 bot wins when both of
/// its settings are present; otherwise the v1 relay is used.
pub fn from_config(config: &Config) -> Result<Arc<dyn PaymentGateway>> {
    if config.has_v2_bot() {
        let url = config
            .v2_bot_url
            .clone()
            .unwrap_or_default();
        let token = config
            .v2_bot_token
            .clone()
            .unwrap_or_default();
        Ok(Arc::new(BotGateway::new(
            url,
            token,
            config.gateway_timeout_secs,
        )?))
    } else {
        let url = config
            .relay_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no payment gateway configured: set relay-url or the v2 bot settings"))?;
        let auth_key = config.relay_auth_key.clone().unwrap_or_default();
        Ok(Arc::new(RelayGateway::new(
            url,
            auth_key,
            config.gateway_timeout_secs,
        )?))
    }
}

/// Pull a message out of a gateway error body. Bodies are expected to look
/// like `{"error": "..."}` but arrive malformed often enough that anything
/// unreadable collapses to an empty string.
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_default()
}

/// Percent-encode a memo for the gateway `data` field, form-urlencoded style.
pub(crate) fn escape_memo(memo: &str) -> String {
    url::form_urlencoded::byte_serialize(memo.as_bytes()).collect()
}
