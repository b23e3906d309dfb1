use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::{extract_error_message, escape_memo, PaymentGateway, PaymentOutcome, PaymentTagStatus};
use crate::error::AppError;

/// Text sent alongside every keysend so the recipient's client shows a
/// notification. The relay expects this exact string.
const KEYSEND_NOTIFICATION_TEXT: &str = "memotext added for notification";

/// Client for the v1 relay node. Authenticates with the `x-user-token`
/// header on every call.
pub struct RelayGateway {
    client: reqwest::Client,
    base_url: String,
    auth_key: String,
}

impl RelayGateway {
    pub fn new(base_url: String, auth_key: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_key,
        })
    }
}

/// Decode the relay's `{"success": ..., "response": {...}}` envelope. The
/// relay is loose with this shape, so every field is read individually and
/// anything missing or mistyped falls back to its default.
fn decode_success_envelope(body: &str) -> PaymentOutcome {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return PaymentOutcome::default(),
    };

    let response = value.get("response").cloned().unwrap_or_default();
    let text = |key: &str| {
        response
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    PaymentOutcome {
        success: value.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
        settled: response
            .get("settled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        payment_request: text("payment_request"),
        payment_hash: text("payment_hash"),
        preimage: text("preimage"),
        amount: text("amount"),
        tag: String::new(),
        error: String::new(),
    }
}

#[async_trait]
impl PaymentGateway for RelayGateway {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn pay_invoice(&self, bolt11: &str) -> PaymentOutcome {
        let url = format!("{}/invoices", self.base_url);
        let response = match self
            .client
            .put(&url)
            .header("x-user-token", &self.auth_key)
            .json(&json!({ "payment_request": bolt11 }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Relay invoice payment request failed");
                return PaymentOutcome::failure("");
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "Relay invoice payment response");

        if !status.is_success() {
            return PaymentOutcome::failure(extract_error_message(&body));
        }
        decode_success_envelope(&body)
    }

    async fn keysend(
        &self,
        destination: &str,
        _route_hint: &str,
        amount_sat: u64,
        memo: &str,
    ) -> PaymentOutcome {
        let url = format!("{}/payment", self.base_url);
        let response = match self
            .client
            .post(&url)
            .header("x-user-token", &self.auth_key)
            .json(&json!({
                "amount": amount_sat,
                "destination_key": destination,
                "text": KEYSEND_NOTIFICATION_TEXT,
                "data": escape_memo(memo),
            }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Relay keysend request failed");
                return PaymentOutcome::failure("");
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "Relay keysend response");

        if !status.is_success() {
            return PaymentOutcome::failure(extract_error_message(&body));
        }

        let value: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if value.get("success").and_then(|v| v.as_bool()).unwrap_or(false) {
            // A relay keysend settles synchronously; there is no pending state.
            PaymentOutcome {
                success: true,
                settled: true,
                ..Default::default()
            }
        } else {
            PaymentOutcome::failure(
                value
                    .get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default(),
            )
        }
    }

    async fn create_invoice(&self, amount_sat: u64, memo: &str) -> Result<String, AppError> {
        let url = format!("{}/invoices", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-user-token", &self.auth_key)
            .json(&json!({
                "amount": amount_sat.to_string(),
                "memo": memo,
            }))
            .send()
            .await
            .map_err(|e| AppError::invoice_error(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::invoice_error(extract_error_message(&body)));
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).unwrap_or_default();
        value
            .get("response")
            .and_then(|r| r.get("invoice"))
            .and_then(|i| i.as_str())
            .map(String::from)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| AppError::invoice_error("relay returned no invoice"))
    }

    async fn check_invoice(&self, payment_request: &str) -> Result<PaymentOutcome, AppError> {
        let url = format!(
            "{}/invoice?payment_request={}",
            self.base_url, payment_request
        );
        let response = self
            .client
            .get(&url)
            .header("x-user-token", &self.auth_key)
            .send()
            .await
            .map_err(|e| AppError::invoice_error(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::invoice_error(extract_error_message(&body)));
        }
        Ok(decode_success_envelope(&body))
    }

    async fn check_payment(&self, _tag: &str) -> Result<PaymentTagStatus, AppError> {
        // Payment tags only exist on the v2 bot; relay keysends settle
        // synchronously and never produce one.
        Err(AppError::payment_failed(
            "payment tags are only issued by the v2 gateway",
        ))
    }
}
