use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::{extract_error_message, escape_memo, PaymentGateway, PaymentOutcome, PaymentTagStatus};
use crate::error::AppError;

/// Client for the v2 payment bot. Authenticates with the `x-admin-token`
/// header on every call.
///
/// The bot reports payment state as an uppercase status word. `COMPLETE`
/// settles immediately, `PENDING` hands back a tag that can be polled with
/// [`PaymentGateway::check_payment`], anything else is a failure.
pub struct BotGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BotGateway {
    pub fn new(base_url: String, token: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> std::result::Result<(reqwest::StatusCode, String), reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("x-admin-token", &self.token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Ok((status, text))
    }
}

fn status_word(body: &str) -> (serde_json::Value, String) {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let status = value
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    (value, status)
}

#[async_trait]
impl PaymentGateway for BotGateway {
    fn name(&self) -> &'static str {
        "v2-bot"
    }

    async fn pay_invoice(&self, bolt11: &str) -> PaymentOutcome {
        let body = json!({ "bolt11": bolt11, "wait": true });
        let (status, text) = match self.post("/pay_invoice", body).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Bot invoice payment request failed");
                return PaymentOutcome::failure("");
            }
        };
        debug!(status = %status, "Bot invoice payment response");

        if !status.is_success() {
            return PaymentOutcome::failure(extract_error_message(&text));
        }

        let (_, word) = status_word(&text);
        if word == "COMPLETE" {
            // The bot response only carries the status, so the original
            // request is echoed back as the fulfilled payment request.
            PaymentOutcome {
                success: true,
                settled: true,
                payment_request: bolt11.to_string(),
                ..Default::default()
            }
        } else {
            PaymentOutcome::failure("")
        }
    }

    async fn keysend(
        &self,
        destination: &str,
        route_hint: &str,
        amount_sat: u64,
        memo: &str,
    ) -> PaymentOutcome {
        let body = json!({
            "amt_msat": amount_sat * 1000,
            "dest": destination,
            "route_hint": route_hint,
            "data": escape_memo(memo),
            "wait": true,
        });
        let (status, text) = match self.post("/pay", body).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Bot keysend request failed");
                return PaymentOutcome::failure("");
            }
        };
        debug!(status = %status, "Bot keysend response");

        if !status.is_success() {
            return PaymentOutcome::failure(extract_error_message(&text));
        }

        let (value, word) = status_word(&text);
        let field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        match word.as_str() {
            "COMPLETE" => PaymentOutcome {
                success: true,
                settled: true,
                payment_hash: field("payment_hash"),
                preimage: field("preimage"),
                tag: field("tag"),
                ..Default::default()
            },
            "PENDING" => PaymentOutcome {
                success: true,
                settled: false,
                tag: field("tag"),
                ..Default::default()
            },
            _ => PaymentOutcome::failure(&field("error")),
        }
    }

    async fn create_invoice(&self, amount_sat: u64, memo: &str) -> Result<String, AppError> {
        let body = json!({ "amt_msat": amount_sat * 1000, "memo": memo });
        let (status, text) = self
            .post("/invoice", body)
            .await
            .map_err(|e| AppError::invoice_error(e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::invoice_error(extract_error_message(&text)));
        }

        let value: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        value
            .get("bolt11")
            .and_then(|v| v.as_str())
            .map(String::from)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::invoice_error("bot returned no invoice"))
    }

    async fn check_invoice(&self, payment_request: &str) -> Result<PaymentOutcome, AppError> {
        let body = json!({ "bolt11": payment_request });
        let (status, text) = self
            .post("/check_invoice", body)
            .await
            .map_err(|e| AppError::invoice_error(e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::invoice_error(extract_error_message(&text)));
        }

        let (_, word) = status_word(&text);
        Ok(PaymentOutcome {
            success: true,
            settled: word == "paid",
            payment_request: payment_request.to_string(),
            ..Default::default()
        })
    }

    async fn check_payment(&self, tag: &str) -> Result<PaymentTagStatus, AppError> {
        let body = json!({ "tag": tag });
        let (status, text) = self
            .post("/check_payment", body)
            .await
            .map_err(|e| AppError::payment_failed(e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::payment_failed(extract_error_message(&text)));
        }

        let (value, word) = status_word(&text);
        match word.as_str() {
            "COMPLETE" => Ok(PaymentTagStatus::Complete),
            "PENDING" => Ok(PaymentTagStatus::Pending),
            _ => {
                let error = value
                    .get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                Ok(PaymentTagStatus::Failed { error })
            }
        }
    }
}
