use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::types::InvoiceType;

pub mod handlers;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BountyEvent {
    // Payment events
    PaymentInitiated {
        payment_id: String,
        bounty_id: i64,
        workspace_uuid: String,
        amount_sat: u64,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    PaymentSucceeded {
        payment_id: String,
        bounty_id: i64,
        workspace_uuid: String,
        amount_sat: u64,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    PaymentPending {
        payment_id: String,
        bounty_id: i64,
        workspace_uuid: String,
        tag: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    PaymentFailed {
        payment_id: String,
        bounty_id: i64,
        workspace_uuid: String,
        reason: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Budget events
    BudgetDebited {
        workspace_uuid: String,
        amount_sat: u64,
        remaining_sat: u64,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    BudgetCredited {
        workspace_uuid: String,
        amount_sat: u64,
        total_sat: u64,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Withdrawal events
    WithdrawalInitiated {
        workspace_uuid: String,
        pubkey: String,
        amount_sat: u64,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    WithdrawalSucceeded {
        workspace_uuid: String,
        amount_sat: u64,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    WithdrawalFailed {
        workspace_uuid: String,
        reason: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Invoice events
    InvoiceCreated {
        payment_request: String,
        invoice_type: InvoiceType,
        amount_sat: u64,
        workspace_uuid: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    InvoiceSettled {
        payment_request: String,
        invoice_type: InvoiceType,
        amount_sat: u64,
        workspace_uuid: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Store events
    StoreQueryExecuted {
        operation: String,
        duration_ms: u128,
        success: bool,
        error_message: Option<String>,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Authentication events
    AuthenticationAttempt {
        pubkey: Option<String>,
        endpoint: String,
        success: bool,
        reason: Option<String>,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // WebSocket client events
    ClientRegistered {
        host: String,
        timestamp: DateTime<Utc>,
    },
    ClientDropped {
        host: String,
        timestamp: DateTime<Utc>,
    },
}

impl BountyEvent {
    /// Generate a unique event ID
    pub fn event_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Get the event timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            BountyEvent::PaymentInitiated { timestamp, .. } => *timestamp,
            BountyEvent::PaymentSucceeded { timestamp, .. } => *timestamp,
            BountyEvent::PaymentPending { timestamp, .. } => *timestamp,
            BountyEvent::PaymentFailed { timestamp, .. } => *timestamp,
            BountyEvent::BudgetDebited { timestamp, .. } => *timestamp,
            BountyEvent::BudgetCredited { timestamp, .. } => *timestamp,
            BountyEvent::WithdrawalInitiated { timestamp, .. } => *timestamp,
            BountyEvent::WithdrawalSucceeded { timestamp, .. } => *timestamp,
            BountyEvent::WithdrawalFailed { timestamp, .. } => *timestamp,
            BountyEvent::InvoiceCreated { timestamp, .. } => *timestamp,
            BountyEvent::InvoiceSettled { timestamp, .. } => *timestamp,
            BountyEvent::StoreQueryExecuted { timestamp, .. } => *timestamp,
            BountyEvent::AuthenticationAttempt { timestamp, .. } => *timestamp,
            BountyEvent::ClientRegistered { timestamp, .. } => *timestamp,
            BountyEvent::ClientDropped { timestamp, .. } => *timestamp,
        }
    }

    /// Get the correlation ID if present
    pub fn correlation_id(&self) -> Option<&String> {
        match self {
            BountyEvent::PaymentInitiated { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::PaymentSucceeded { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::PaymentPending { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::PaymentFailed { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::BudgetDebited { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::BudgetCredited { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::WithdrawalInitiated { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::WithdrawalSucceeded { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::WithdrawalFailed { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::InvoiceCreated { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::InvoiceSettled { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::StoreQueryExecuted { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::AuthenticationAttempt { correlation_id, .. } => correlation_id.as_ref(),
            BountyEvent::ClientRegistered { .. } => None,
            BountyEvent::ClientDropped { .. } => None,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            BountyEvent::PaymentInitiated { .. } => "payment_initiated",
            BountyEvent::PaymentSucceeded { .. } => "payment_succeeded",
            BountyEvent::PaymentPending { .. } => "payment_pending",
            BountyEvent::PaymentFailed { .. } => "payment_failed",
            BountyEvent::BudgetDebited { .. } => "budget_debited",
            BountyEvent::BudgetCredited { .. } => "budget_credited",
            BountyEvent::WithdrawalInitiated { .. } => "withdrawal_initiated",
            BountyEvent::WithdrawalSucceeded { .. } => "withdrawal_succeeded",
            BountyEvent::WithdrawalFailed { .. } => "withdrawal_failed",
            BountyEvent::InvoiceCreated { .. } => "invoice_created",
            BountyEvent::InvoiceSettled { .. } => "invoice_settled",
            BountyEvent::StoreQueryExecuted { .. } => "store_query_executed",
            BountyEvent::AuthenticationAttempt { .. } => "authentication_attempt",
            BountyEvent::ClientRegistered { .. } => "client_registered",
            BountyEvent::ClientDropped { .. } => "client_dropped",
        }
    }
}

/// Trait for handling events asynchronously
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event
    async fn handle(&self, event: BountyEvent) -> anyhow::Result<()>;

    /// Get the name of this handler for identification
    fn name(&self) -> &str;

    /// Whether this handler should block event publishing on failure
    fn is_critical(&self) -> bool {
        false
    }
}

/// Event bus for distributing events to multiple handlers
pub struct EventBus {
    sender: broadcast::Sender<BountyEvent>,
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    max_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("max_capacity", &self.max_capacity)
            .field(
                "handlers_count",
                &self.handlers.try_read().map(|h| h.len()).unwrap_or(0),
            )
            .finish()
    }
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            handlers: Arc::new(RwLock::new(Vec::new())),
            max_capacity: capacity,
        }
    }

    /// Register an event handler
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        let handler_name = handler.name().to_string();
        handlers.push(handler);
        info!(
            handler_name = %handler_name,
            total_handlers = handlers.len(),
            "Event handler registered successfully"
        );
    }

    /// Publish an event to all registered handlers
    pub async fn publish(&self, event: BountyEvent) -> anyhow::Result<()> {
        let event_id = event.event_id();
        let event_type = event.event_type();
        let correlation_id = event.correlation_id().cloned();
        let timestamp = event.timestamp();

        debug!(
            event_id = %event_id,
            event_type = %event_type,
            correlation_id = ?correlation_id,
            timestamp = %timestamp,
            "Publishing event"
        );

        // Send to broadcast channel for real-time subscribers (non-blocking)
        match self.sender.send(event.clone()) {
            Ok(subscriber_count) => {
                debug!(
                    event_id = %event_id,
                    event_type = %event_type,
                    subscriber_count = subscriber_count,
                    "Event broadcast to subscribers"
                );
            }
            Err(broadcast::error::SendError(_)) => {
                // No active receivers, this is not an error
                debug!(
                    event_id = %event_id,
                    event_type = %event_type,
                    "Event published but no active subscribers"
                );
            }
        }

        // Process registered handlers
        let handlers = self.handlers.read().await;
        if handlers.is_empty() {
            warn!(
                event_id = %event_id,
                event_type = %event_type,
                "No event handlers registered"
            );
            return Ok(());
        }

        // Track critical handlers for potential blocking
        let mut critical_handler_futures = Vec::new();
        let mut non_critical_handlers = 0;

        for handler in handlers.iter() {
            let handler_clone = handler.clone();
            let event_clone = event.clone();
            let event_id_clone = event_id.clone();

            if handler.is_critical() {
                // Critical handlers: await them to ensure they complete
                critical_handler_futures.push(async move {
                    let handler_name = handler_clone.name();
                    match handler_clone.handle(event_clone).await {
                        Ok(()) => {
                            debug!(
                                event_id = %event_id_clone,
                                handler_name = %handler_name,
                                "Critical event handler completed successfully"
                            );
                        }
                        Err(e) => {
                            error!(
                                event_id = %event_id_clone,
                                handler_name = %handler_name,
                                error = ?e,
                                "Critical event handler failed"
                            );
                        }
                    }
                });
            } else {
                // Non-critical handlers: spawn them in the background
                non_critical_handlers += 1;
                tokio::spawn(async move {
                    let handler_name = handler_clone.name();
                    match handler_clone.handle(event_clone).await {
                        Ok(()) => {
                            debug!(
                                event_id = %event_id_clone,
                                handler_name = %handler_name,
                                "Event handler completed successfully"
                            );
                        }
                        Err(e) => {
                            error!(
                                event_id = %event_id_clone,
                                handler_name = %handler_name,
                                error = ?e,
                                "Event handler failed"
                            );
                        }
                    }
                });
            }
        }

        // Wait for critical handlers to complete
        for future in critical_handler_futures {
            future.await;
        }

        debug!(
            event_id = %event_id,
            event_type = %event_type,
            total_handlers = handlers.len(),
            critical_handlers = handlers.iter().filter(|h| h.is_critical()).count(),
            non_critical_handlers = non_critical_handlers,
            "Event processing initiated"
        );

        Ok(())
    }

    /// Subscribe to the event stream for real-time event processing
    pub fn subscribe(&self) -> broadcast::Receiver<BountyEvent> {
        self.sender.subscribe()
    }

    /// Get the current number of registered handlers
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Get statistics about the event bus
    pub async fn stats(&self) -> EventBusStats {
        let handlers = self.handlers.read().await;
        EventBusStats {
            capacity: self.max_capacity,
            handler_count: handlers.len(),
            critical_handler_count: handlers.iter().filter(|h| h.is_critical()).count(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBusStats {
    pub capacity: usize,
    pub handler_count: usize,
    pub critical_handler_count: usize,
}

#[cfg(test)]
mod tests;
