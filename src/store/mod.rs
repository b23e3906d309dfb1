use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{
    Bounty, InvoiceRecord, PaymentHistory, PaymentStatus, PaymentType, Person, Workspace,
    WorkspaceBudget,
};

pub mod instrumented;
pub mod memory;

pub use instrumented::InstrumentedStore;
pub use memory::MemoryStore;

/// Input for appending a payment history row. The store assigns the id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewPaymentHistory {
    pub bounty_id: i64,
    pub workspace_uuid: String,
    pub amount: u64,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub sender_pubkey: String,
    pub receiver_pubkey: String,
    pub tag: String,
    pub payment_request: String,
    pub error: String,
}

/// Persistence operations the payment flows depend on. Implementations must
/// keep `debit_budget_if_available` atomic: the check and the subtraction
/// happen under one lock so concurrent spenders cannot both pass.
#[async_trait]
pub trait Store: Send + Sync {
    // Bounties
    async fn bounty(&self, id: i64) -> Result<Option<Bounty>>;
    async fn bounty_by_created(&self, created: i64) -> Result<Option<Bounty>>;
    async fn mark_bounty_paid(&self, id: i64) -> Result<()>;
    async fn mark_bounty_payment_pending(&self, id: i64) -> Result<()>;
    async fn mark_bounty_payment_failed(&self, id: i64) -> Result<()>;

    // People and workspaces
    async fn person_by_pubkey(&self, pubkey: &str) -> Result<Option<Person>>;
    async fn workspace(&self, uuid: &str) -> Result<Option<Workspace>>;

    // Access control
    async fn user_has_access(&self, pubkey: &str, workspace_uuid: &str, role: &str)
        -> Result<bool>;

    // Budgets
    async fn workspace_budget(&self, workspace_uuid: &str) -> Result<WorkspaceBudget>;
    async fn credit_budget(&self, workspace_uuid: &str, amount_sat: u64) -> Result<u64>;
    async fn debit_budget_if_available(&self, workspace_uuid: &str, amount_sat: u64)
        -> Result<bool>;

    // Payment history
    async fn append_payment(&self, payment: NewPaymentHistory) -> Result<PaymentHistory>;
    async fn update_payment_status(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        error: Option<String>,
    ) -> Result<()>;
    async fn pending_payment_by_bounty(&self, bounty_id: i64) -> Result<Option<PaymentHistory>>;
    /// Newest withdrawal row for a workspace, the basis of the withdrawal
    /// cooldown.
    async fn last_withdrawal(&self, workspace_uuid: &str) -> Result<Option<PaymentHistory>>;

    // Invoices
    async fn add_invoice(&self, invoice: InvoiceRecord) -> Result<()>;
    async fn invoice(&self, payment_request: &str) -> Result<Option<InvoiceRecord>>;
    /// Mark an invoice settled. Returns true only for the caller that flips
    /// the flag, so settlement side effects run exactly once.
    async fn settle_invoice(&self, payment_request: &str) -> Result<bool>;
    async fn unsettled_invoices(&self) -> Result<Vec<InvoiceRecord>>;
}

/// Statistics for store operations
#[derive(Debug, Default)]
pub struct StoreStats {
    pub total_operations: AtomicU64,
    pub successful_operations: AtomicU64,
    pub failed_operations: AtomicU64,
    pub slow_operations: AtomicU64,
    pub total_duration_ms: AtomicU64,
}

impl StoreStats {
    pub fn record_operation(&self, duration: Duration, success: bool) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_operations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_operations.fetch_add(1, Ordering::Relaxed);
        }

        // Track slow operations (>100ms)
        if duration.as_millis() > 100 {
            self.slow_operations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_summary(&self) -> StoreStatsSummary {
        let total = self.total_operations.load(Ordering::Relaxed);
        let successful = self.successful_operations.load(Ordering::Relaxed);
        let failed = self.failed_operations.load(Ordering::Relaxed);
        let slow = self.slow_operations.load(Ordering::Relaxed);
        let total_duration = self.total_duration_ms.load(Ordering::Relaxed);

        StoreStatsSummary {
            total_operations: total,
            successful_operations: successful,
            failed_operations: failed,
            slow_operations: slow,
            average_duration_ms: if total > 0 { total_duration / total } else { 0 },
            success_rate: if total > 0 {
                (successful as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreStatsSummary {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub slow_operations: u64,
    pub average_duration_ms: u64,
    pub success_rate: f64,
}
