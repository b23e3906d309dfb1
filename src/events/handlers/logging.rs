use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{BountyEvent, EventHandler};
use crate::observability::sanitization::{sanitize_invoice, sanitize_pubkey};

/// Event handler that logs all events with appropriate levels and sanitization
pub struct LoggingEventHandler {
    include_debug_events: bool,
}

impl LoggingEventHandler {
    pub fn new(include_debug_events: bool) -> Self {
        Self {
            include_debug_events,
        }
    }
}

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle(&self, event: BountyEvent) -> anyhow::Result<()> {
        match event {
            BountyEvent::PaymentInitiated {
                payment_id,
                bounty_id,
                workspace_uuid,
                amount_sat,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "payment_initiated",
                    payment_id = %payment_id,
                    bounty_id = bounty_id,
                    workspace_uuid = %workspace_uuid,
                    amount_sat = amount_sat,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payment initiated"
                );
            }
            BountyEvent::PaymentSucceeded {
                payment_id,
                bounty_id,
                workspace_uuid,
                amount_sat,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "payment_succeeded",
                    payment_id = %payment_id,
                    bounty_id = bounty_id,
                    workspace_uuid = %workspace_uuid,
                    amount_sat = amount_sat,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payment succeeded"
                );
            }
            BountyEvent::PaymentPending {
                payment_id,
                bounty_id,
                workspace_uuid,
                tag,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "payment_pending",
                    payment_id = %payment_id,
                    bounty_id = bounty_id,
                    workspace_uuid = %workspace_uuid,
                    tag = %tag,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payment pending settlement"
                );
            }
            BountyEvent::PaymentFailed {
                payment_id,
                bounty_id,
                workspace_uuid,
                reason,
                correlation_id,
                timestamp,
            } => {
                warn!(
                    event_type = "payment_failed",
                    payment_id = %payment_id,
                    bounty_id = bounty_id,
                    workspace_uuid = %workspace_uuid,
                    reason = %reason,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payment failed"
                );
            }
            BountyEvent::BudgetDebited {
                workspace_uuid,
                amount_sat,
                remaining_sat,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "budget_debited",
                    workspace_uuid = %workspace_uuid,
                    amount_sat = amount_sat,
                    remaining_sat = remaining_sat,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Workspace budget debited"
                );
            }
            BountyEvent::BudgetCredited {
                workspace_uuid,
                amount_sat,
                total_sat,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "budget_credited",
                    workspace_uuid = %workspace_uuid,
                    amount_sat = amount_sat,
                    total_sat = total_sat,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Workspace budget credited"
                );
            }
            BountyEvent::WithdrawalInitiated {
                workspace_uuid,
                pubkey,
                amount_sat,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "withdrawal_initiated",
                    workspace_uuid = %workspace_uuid,
                    pubkey = %sanitize_pubkey(&pubkey),
                    amount_sat = amount_sat,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Withdrawal initiated"
                );
            }
            BountyEvent::WithdrawalSucceeded {
                workspace_uuid,
                amount_sat,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "withdrawal_succeeded",
                    workspace_uuid = %workspace_uuid,
                    amount_sat = amount_sat,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Withdrawal succeeded"
                );
            }
            BountyEvent::WithdrawalFailed {
                workspace_uuid,
                reason,
                correlation_id,
                timestamp,
            } => {
                error!(
                    event_type = "withdrawal_failed",
                    workspace_uuid = %workspace_uuid,
                    reason = %reason,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Withdrawal failed"
                );
            }
            BountyEvent::InvoiceCreated {
                payment_request,
                invoice_type,
                amount_sat,
                workspace_uuid,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "invoice_created",
                    payment_request = %sanitize_invoice(&payment_request),
                    invoice_type = ?invoice_type,
                    amount_sat = amount_sat,
                    workspace_uuid = %workspace_uuid,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Invoice created"
                );
            }
            BountyEvent::InvoiceSettled {
                payment_request,
                invoice_type,
                amount_sat,
                workspace_uuid,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "invoice_settled",
                    payment_request = %sanitize_invoice(&payment_request),
                    invoice_type = ?invoice_type,
                    amount_sat = amount_sat,
                    workspace_uuid = %workspace_uuid,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Invoice settled"
                );
            }
            BountyEvent::StoreQueryExecuted {
                operation,
                duration_ms,
                success,
                error_message,
                correlation_id,
                timestamp,
            } => {
                if success {
                    if duration_ms > 100 {
                        // Warn on slow queries (>100ms)
                        warn!(
                            event_type = "store_query_slow",
                            operation = %operation,
                            duration_ms = duration_ms,
                            correlation_id = ?correlation_id,
                            timestamp = %timestamp,
                            "Slow store query detected"
                        );
                    } else if self.include_debug_events {
                        debug!(
                            event_type = "store_query_executed",
                            operation = %operation,
                            duration_ms = duration_ms,
                            correlation_id = ?correlation_id,
                            timestamp = %timestamp,
                            "Store query executed successfully"
                        );
                    }
                } else {
                    error!(
                        event_type = "store_query_failed",
                        operation = %operation,
                        duration_ms = duration_ms,
                        error_message = ?error_message,
                        correlation_id = ?correlation_id,
                        timestamp = %timestamp,
                        "Store query failed"
                    );
                }
            }
            BountyEvent::AuthenticationAttempt {
                pubkey,
                endpoint,
                success,
                reason,
                correlation_id,
                timestamp,
            } => {
                let pubkey = pubkey.as_deref().map(sanitize_pubkey);
                if success {
                    info!(
                        event_type = "authentication_success",
                        pubkey = ?pubkey,
                        endpoint = %endpoint,
                        correlation_id = ?correlation_id,
                        timestamp = %timestamp,
                        "Authentication successful"
                    );
                } else {
                    warn!(
                        event_type = "authentication_failed",
                        pubkey = ?pubkey,
                        endpoint = %endpoint,
                        reason = ?reason,
                        correlation_id = ?correlation_id,
                        timestamp = %timestamp,
                        "Authentication failed"
                    );
                }
            }
            BountyEvent::ClientRegistered { host, timestamp } => {
                if self.include_debug_events {
                    debug!(
                        event_type = "client_registered",
                        host = %host,
                        timestamp = %timestamp,
                        "WebSocket client registered"
                    );
                }
            }
            BountyEvent::ClientDropped { host, timestamp } => {
                if self.include_debug_events {
                    debug!(
                        event_type = "client_dropped",
                        host = %host,
                        timestamp = %timestamp,
                        "WebSocket client dropped"
                    );
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }

    /// Logging handler is critical - we want to ensure logs are written
    fn is_critical(&self) -> bool {
        true
    }
}
