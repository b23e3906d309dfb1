//! Settlement application. Both the invoice poll endpoint and the background
//! sweep land here, so the credit path is written once and guarded once.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::events::{BountyEvent, EventBus};
use crate::ledger::BudgetLedger;
use crate::store::Store;
use crate::types::{InvoiceRecord, InvoiceType, PaymentStatus};

/// Apply the side effects of a settled invoice exactly once.
///
/// The store's `settle_invoice` flips the settled flag atomically and only
/// one caller wins the claim; every later call is a no-op. Returns true when
/// this call performed the settlement.
pub async fn apply_settlement(
    store: &Arc<dyn Store>,
    ledger: &BudgetLedger,
    event_bus: &EventBus,
    payment_request: &str,
    correlation_id: Option<String>,
) -> anyhow::Result<bool> {
    let Some(invoice) = store.invoice(payment_request).await? else {
        // Nothing stored for this payment request; the gateway may know
        // invoices we never issued.
        return Ok(false);
    };

    if !store.settle_invoice(payment_request).await? {
        return Ok(false);
    }

    match invoice.invoice_type {
        InvoiceType::Budget => credit_budget_deposit(store, ledger, &invoice).await?,
        InvoiceType::Keysend => complete_bounty_payment(store, &invoice).await?,
    }

    info!(
        workspace_uuid = %invoice.workspace_uuid,
        invoice_type = ?invoice.invoice_type,
        amount_sat = invoice.amount,
        "Invoice settled"
    );

    if let Err(e) = event_bus
        .publish(BountyEvent::InvoiceSettled {
            payment_request: payment_request.to_string(),
            invoice_type: invoice.invoice_type,
            amount_sat: invoice.amount,
            workspace_uuid: invoice.workspace_uuid.clone(),
            correlation_id,
            timestamp: Utc::now(),
        })
        .await
    {
        warn!(error = %e, "Failed to publish invoice settlement event");
    }

    Ok(true)
}

/// A settled budget invoice funds the workspace and leaves a deposit row.
async fn credit_budget_deposit(
    store: &Arc<dyn Store>,
    ledger: &BudgetLedger,
    invoice: &InvoiceRecord,
) -> anyhow::Result<()> {
    ledger
        .credit(&invoice.workspace_uuid, invoice.amount, None)
        .await?;

    store
        .append_payment(crate::store::NewPaymentHistory {
            bounty_id: 0,
            workspace_uuid: invoice.workspace_uuid.clone(),
            amount: invoice.amount,
            payment_type: crate::types::PaymentType::Deposit,
            status: PaymentStatus::Complete,
            sender_pubkey: invoice.owner_pubkey.clone(),
            receiver_pubkey: invoice.owner_pubkey.clone(),
            tag: String::new(),
            payment_request: invoice.payment_request.clone(),
            error: String::new(),
        })
        .await?;

    Ok(())
}

/// A settled keysend invoice confirms an in-flight bounty payment.
async fn complete_bounty_payment(
    store: &Arc<dyn Store>,
    invoice: &InvoiceRecord,
) -> anyhow::Result<()> {
    store.mark_bounty_paid(invoice.bounty_id).await?;

    if let Some(pending) = store.pending_payment_by_bounty(invoice.bounty_id).await? {
        store
            .update_payment_status(pending.id, PaymentStatus::Complete, None)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::Bounty;

    fn budget_invoice(payment_request: &str, amount: u64) -> InvoiceRecord {
        InvoiceRecord {
            payment_request: payment_request.to_string(),
            invoice_type: InvoiceType::Budget,
            amount,
            workspace_uuid: "ws-1".to_string(),
            owner_pubkey: "alice".to_string(),
            bounty_id: 0,
            settled: false,
            created: Utc::now(),
        }
    }

    fn test_bounty(id: i64) -> Bounty {
        Bounty {
            id,
            owner_pubkey: "owner".to_string(),
            assignee_pubkey: "assignee".to_string(),
            workspace_uuid: "ws-1".to_string(),
            title: "fix the build".to_string(),
            price: 1000,
            paid: false,
            payment_pending: true,
            payment_failed: false,
            completed: false,
            created: 1_700_000_000_000,
            paid_date: None,
            completion_date: None,
            updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_budget_settlement_credits_once() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let event_bus = EventBus::new(16);
        let ledger = BudgetLedger::new(
            Arc::clone(&store),
            Arc::new(EventBus::new(16)),
        );

        store.add_invoice(budget_invoice("lnbc500n1p", 500)).await.unwrap();

        let applied = apply_settlement(&store, &ledger, &event_bus, "lnbc500n1p", None)
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(ledger.available("ws-1").await.unwrap(), 500);

        // A second poll of the same invoice must not credit again.
        let applied_again = apply_settlement(&store, &ledger, &event_bus, "lnbc500n1p", None)
            .await
            .unwrap();
        assert!(!applied_again);
        assert_eq!(ledger.available("ws-1").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_keysend_settlement_marks_bounty_paid() {
        let memory = Arc::new(MemoryStore::new());
        memory.add_bounty(test_bounty(9)).await;
        let store: Arc<dyn Store> = memory;
        let event_bus = EventBus::new(16);
        let ledger = BudgetLedger::new(
            Arc::clone(&store),
            Arc::new(EventBus::new(16)),
        );

        let mut invoice = budget_invoice("lnbc9k1p", 1000);
        invoice.invoice_type = InvoiceType::Keysend;
        invoice.bounty_id = 9;
        store.add_invoice(invoice).await.unwrap();

        let pending = store
            .append_payment(crate::store::NewPaymentHistory {
                bounty_id: 9,
                workspace_uuid: "ws-1".to_string(),
                amount: 1000,
                payment_type: crate::types::PaymentType::Payment,
                status: PaymentStatus::Pending,
                sender_pubkey: "owner".to_string(),
                receiver_pubkey: "assignee".to_string(),
                tag: "tag-9".to_string(),
                payment_request: "lnbc9k1p".to_string(),
                error: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);

        let applied = apply_settlement(&store, &ledger, &event_bus, "lnbc9k1p", None)
            .await
            .unwrap();
        assert!(applied);

        let bounty = store.bounty(9).await.unwrap().unwrap();
        assert!(bounty.paid);

        // The pending row was promoted, so the lookup comes back empty.
        assert!(store
            .pending_payment_by_bounty(9)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_invoice_is_ignored() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let event_bus = EventBus::new(16);
        let ledger = BudgetLedger::new(
            Arc::clone(&store),
            Arc::new(EventBus::new(16)),
        );

        let applied = apply_settlement(&store, &ledger, &event_bus, "lnbc-unknown", None)
            .await
            .unwrap();
        assert!(!applied);
    }
}
