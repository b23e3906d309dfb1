use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};

use super::{NewPaymentHistory, Store, StoreStats};
use crate::events::{BountyEvent, EventBus};
use crate::types::{
    Bounty, InvoiceRecord, PaymentHistory, PaymentStatus, Person, Workspace, WorkspaceBudget,
};

/// Instrumented store wrapper that logs all operations
pub struct InstrumentedStore<T: Store> {
    inner: Arc<T>,
    event_bus: Arc<EventBus>,
    stats: Arc<StoreStats>,
    service_name: String,
}

impl<T: Store> InstrumentedStore<T> {
    pub fn new(inner: Arc<T>, event_bus: Arc<EventBus>, service_name: impl Into<String>) -> Self {
        Self {
            inner,
            event_bus,
            stats: Arc::new(StoreStats::default()),
            service_name: service_name.into(),
        }
    }

    pub fn stats(&self) -> Arc<StoreStats> {
        self.stats.clone()
    }

    /// Execute a store operation with instrumentation
    #[instrument(skip(self, operation), fields(operation = %op_name))]
    async fn execute_with_instrumentation<F, R>(&self, operation: F, op_name: &str) -> Result<R>
    where
        F: std::future::Future<Output = Result<R>>,
    {
        let start = Instant::now();

        debug!(
            operation = %op_name,
            service = %self.service_name,
            "Store operation started"
        );

        let result = operation.await;
        let duration = start.elapsed();
        let success = result.is_ok();

        // Record statistics
        self.stats.record_operation(duration, success);

        // Log operation result
        match &result {
            Ok(_) => {
                if duration.as_millis() > 100 {
                    warn!(
                        operation = %op_name,
                        duration_ms = %duration.as_millis(),
                        service = %self.service_name,
                        "Slow store operation detected"
                    );
                } else {
                    debug!(
                        operation = %op_name,
                        duration_ms = %duration.as_millis(),
                        service = %self.service_name,
                        "Store operation completed successfully"
                    );
                }
            }
            Err(e) => {
                warn!(
                    operation = %op_name,
                    duration_ms = %duration.as_millis(),
                    error = ?e,
                    service = %self.service_name,
                    "Store operation failed"
                );
            }
        }

        // Publish event
        let event = BountyEvent::StoreQueryExecuted {
            operation: op_name.to_string(),
            duration_ms: duration.as_millis(),
            success,
            error_message: result.as_ref().err().map(|e| e.to_string()),
            correlation_id: None,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.event_bus.publish(event).await {
            warn!(
                operation = %op_name,
                error = ?e,
                "Failed to publish store event"
            );
        }

        result
    }
}

#[async_trait]
impl<T: Store> Store for InstrumentedStore<T> {
    async fn bounty(&self, id: i64) -> Result<Option<Bounty>> {
        self.execute_with_instrumentation(self.inner.bounty(id), "bounty")
            .await
    }

    async fn bounty_by_created(&self, created: i64) -> Result<Option<Bounty>> {
        self.execute_with_instrumentation(self.inner.bounty_by_created(created), "bounty_by_created")
            .await
    }

    async fn mark_bounty_paid(&self, id: i64) -> Result<()> {
        self.execute_with_instrumentation(self.inner.mark_bounty_paid(id), "mark_bounty_paid")
            .await
    }

    async fn mark_bounty_payment_pending(&self, id: i64) -> Result<()> {
        self.execute_with_instrumentation(
            self.inner.mark_bounty_payment_pending(id),
            "mark_bounty_payment_pending",
        )
        .await
    }

    async fn mark_bounty_payment_failed(&self, id: i64) -> Result<()> {
        self.execute_with_instrumentation(
            self.inner.mark_bounty_payment_failed(id),
            "mark_bounty_payment_failed",
        )
        .await
    }

    async fn person_by_pubkey(&self, pubkey: &str) -> Result<Option<Person>> {
        self.execute_with_instrumentation(self.inner.person_by_pubkey(pubkey), "person_by_pubkey")
            .await
    }

    async fn workspace(&self, uuid: &str) -> Result<Option<Workspace>> {
        self.execute_with_instrumentation(self.inner.workspace(uuid), "workspace")
            .await
    }

    async fn user_has_access(
        &self,
        pubkey: &str,
        workspace_uuid: &str,
        role: &str,
    ) -> Result<bool> {
        self.execute_with_instrumentation(
            self.inner.user_has_access(pubkey, workspace_uuid, role),
            "user_has_access",
        )
        .await
    }

    async fn workspace_budget(&self, workspace_uuid: &str) -> Result<WorkspaceBudget> {
        self.execute_with_instrumentation(
            self.inner.workspace_budget(workspace_uuid),
            "workspace_budget",
        )
        .await
    }

    async fn credit_budget(&self, workspace_uuid: &str, amount_sat: u64) -> Result<u64> {
        self.execute_with_instrumentation(
            self.inner.credit_budget(workspace_uuid, amount_sat),
            "credit_budget",
        )
        .await
    }

    async fn debit_budget_if_available(
        &self,
        workspace_uuid: &str,
        amount_sat: u64,
    ) -> Result<bool> {
        self.execute_with_instrumentation(
            self.inner.debit_budget_if_available(workspace_uuid, amount_sat),
            "debit_budget_if_available",
        )
        .await
    }

    async fn append_payment(&self, payment: NewPaymentHistory) -> Result<PaymentHistory> {
        self.execute_with_instrumentation(self.inner.append_payment(payment), "append_payment")
            .await
    }

    async fn update_payment_status(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        error: Option<String>,
    ) -> Result<()> {
        self.execute_with_instrumentation(
            self.inner.update_payment_status(payment_id, status, error),
            "update_payment_status",
        )
        .await
    }

    async fn pending_payment_by_bounty(&self, bounty_id: i64) -> Result<Option<PaymentHistory>> {
        self.execute_with_instrumentation(
            self.inner.pending_payment_by_bounty(bounty_id),
            "pending_payment_by_bounty",
        )
        .await
    }

    async fn last_withdrawal(&self, workspace_uuid: &str) -> Result<Option<PaymentHistory>> {
        self.execute_with_instrumentation(
            self.inner.last_withdrawal(workspace_uuid),
            "last_withdrawal",
        )
        .await
    }

    async fn add_invoice(&self, invoice: InvoiceRecord) -> Result<()> {
        self.execute_with_instrumentation(self.inner.add_invoice(invoice), "add_invoice")
            .await
    }

    async fn invoice(&self, payment_request: &str) -> Result<Option<InvoiceRecord>> {
        self.execute_with_instrumentation(self.inner.invoice(payment_request), "invoice")
            .await
    }

    async fn settle_invoice(&self, payment_request: &str) -> Result<bool> {
        self.execute_with_instrumentation(self.inner.settle_invoice(payment_request), "settle_invoice")
            .await
    }

    async fn unsettled_invoices(&self) -> Result<Vec<InvoiceRecord>> {
        self.execute_with_instrumentation(self.inner.unsettled_invoices(), "unsettled_invoices")
            .await
    }
}
