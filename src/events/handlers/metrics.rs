use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::debug;

use crate::events::{BountyEvent, EventHandler};
use crate::metrics::{
    AUTH_ATTEMPTS_TOTAL, BUDGET_OPERATIONS_TOTAL, EVENT_BUS_EVENTS_TOTAL, INVOICES_TOTAL,
    INVOICE_AMOUNT_SATS, PAYMENTS_TOTAL, PAYMENT_AMOUNT_SATS, STORE_QUERIES_TOTAL,
    STORE_QUERY_DURATION_SECONDS, WITHDRAWALS_TOTAL, WITHDRAWAL_AMOUNT_SATS, WS_CLIENTS_TOTAL,
};
use crate::types::InvoiceType;

/// Event handler that collects metrics from events for Prometheus export
pub struct MetricsEventHandler {
    service_name: String,
}

impl MetricsEventHandler {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Record payment metrics using standardized metric names
    fn record_payment_metrics(&self, workspace_uuid: &str, status: &str, amount_sat: Option<u64>) {
        counter!(PAYMENTS_TOTAL, "workspace_uuid" => workspace_uuid.to_string(), "status" => status.to_string()).increment(1);

        // Payment amounts (if available)
        if let Some(amount) = amount_sat {
            histogram!(PAYMENT_AMOUNT_SATS, "workspace_uuid" => workspace_uuid.to_string())
                .record(amount as f64);
        }
    }

    /// Record withdrawal metrics using standardized metric names
    fn record_withdrawal_metrics(
        &self,
        workspace_uuid: &str,
        status: &str,
        amount_sat: Option<u64>,
    ) {
        counter!(WITHDRAWALS_TOTAL, "workspace_uuid" => workspace_uuid.to_string(), "status" => status.to_string()).increment(1);

        if let Some(amount) = amount_sat {
            histogram!(WITHDRAWAL_AMOUNT_SATS, "workspace_uuid" => workspace_uuid.to_string())
                .record(amount as f64);
        }
    }

    /// Record invoice metrics using standardized metric names
    fn record_invoice_metrics(
        &self,
        invoice_type: InvoiceType,
        status: &str,
        amount_sat: Option<u64>,
    ) {
        let type_label = match invoice_type {
            InvoiceType::Keysend => "keysend",
            InvoiceType::Budget => "budget",
        };

        counter!(INVOICES_TOTAL, "invoice_type" => type_label, "status" => status.to_string())
            .increment(1);

        if let Some(amount) = amount_sat {
            histogram!(INVOICE_AMOUNT_SATS, "invoice_type" => type_label).record(amount as f64);
        }
    }

    /// Record store metrics using standardized metric names
    fn record_store_metrics(&self, operation: &str, duration_ms: u128, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(STORE_QUERIES_TOTAL, "operation" => operation.to_string(), "status" => status.to_string()).increment(1);

        // Store operation duration in seconds (converting from milliseconds)
        histogram!(STORE_QUERY_DURATION_SECONDS, "operation" => operation.to_string())
            .record(duration_ms as f64 / 1000.0);
    }

    /// Record authentication metrics using standardized metric names
    fn record_auth_metrics(&self, endpoint: &str, success: bool) {
        let status = if success { "success" } else { "failure" };

        counter!(AUTH_ATTEMPTS_TOTAL, "endpoint" => endpoint.to_string(), "status" => status.to_string()).increment(1);
    }
}

#[async_trait]
impl EventHandler for MetricsEventHandler {
    async fn handle(&self, event: BountyEvent) -> anyhow::Result<()> {
        // Capture event type before matching (to avoid move issues)
        let event_type = event.event_type().to_string();

        match event {
            BountyEvent::PaymentInitiated {
                workspace_uuid,
                amount_sat,
                ..
            } => {
                self.record_payment_metrics(&workspace_uuid, "initiated", Some(amount_sat));
            }
            BountyEvent::PaymentSucceeded {
                workspace_uuid,
                amount_sat,
                ..
            } => {
                self.record_payment_metrics(&workspace_uuid, "succeeded", Some(amount_sat));
            }
            BountyEvent::PaymentPending { workspace_uuid, .. } => {
                self.record_payment_metrics(&workspace_uuid, "pending", None);
            }
            BountyEvent::PaymentFailed { workspace_uuid, .. } => {
                self.record_payment_metrics(&workspace_uuid, "failed", None);
            }
            BountyEvent::BudgetDebited {
                workspace_uuid,
                amount_sat,
                ..
            } => {
                counter!(BUDGET_OPERATIONS_TOTAL, "workspace_uuid" => workspace_uuid, "operation" => "debit").increment(1);
                histogram!(PAYMENT_AMOUNT_SATS, "workspace_uuid" => "all")
                    .record(amount_sat as f64);
            }
            BountyEvent::BudgetCredited {
                workspace_uuid, ..
            } => {
                counter!(BUDGET_OPERATIONS_TOTAL, "workspace_uuid" => workspace_uuid, "operation" => "credit").increment(1);
            }
            BountyEvent::WithdrawalInitiated {
                workspace_uuid,
                amount_sat,
                ..
            } => {
                self.record_withdrawal_metrics(&workspace_uuid, "initiated", Some(amount_sat));
            }
            BountyEvent::WithdrawalSucceeded {
                workspace_uuid,
                amount_sat,
                ..
            } => {
                self.record_withdrawal_metrics(&workspace_uuid, "succeeded", Some(amount_sat));
            }
            BountyEvent::WithdrawalFailed { workspace_uuid, .. } => {
                self.record_withdrawal_metrics(&workspace_uuid, "failed", None);
            }
            BountyEvent::InvoiceCreated {
                invoice_type,
                amount_sat,
                ..
            } => {
                self.record_invoice_metrics(invoice_type, "created", Some(amount_sat));
            }
            BountyEvent::InvoiceSettled {
                invoice_type,
                amount_sat,
                ..
            } => {
                self.record_invoice_metrics(invoice_type, "settled", Some(amount_sat));
            }
            BountyEvent::StoreQueryExecuted {
                operation,
                duration_ms,
                success,
                ..
            } => {
                self.record_store_metrics(&operation, duration_ms, success);
            }
            BountyEvent::AuthenticationAttempt {
                endpoint, success, ..
            } => {
                self.record_auth_metrics(&endpoint, success);
            }
            BountyEvent::ClientRegistered { .. } => {
                counter!(WS_CLIENTS_TOTAL, "action" => "registered").increment(1);
            }
            BountyEvent::ClientDropped { .. } => {
                counter!(WS_CLIENTS_TOTAL, "action" => "dropped").increment(1);
            }
        }

        // Record general event bus metrics
        counter!(EVENT_BUS_EVENTS_TOTAL, "event_type" => event_type).increment(1);

        debug!(handler = self.name(), "Event metrics recorded");

        Ok(())
    }

    fn name(&self) -> &str {
        "metrics"
    }

    /// Metrics handler is not critical - failures shouldn't block event
    /// processing
    fn is_critical(&self) -> bool {
        false
    }
}
