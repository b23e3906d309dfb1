use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{NewPaymentHistory, Store};
use crate::types::{
    Bounty, InvoiceRecord, PaymentHistory, PaymentStatus, PaymentType, Person, Workspace,
    WorkspaceBudget,
};

#[derive(Default)]
struct Inner {
    bounties: HashMap<i64, Bounty>,
    people: HashMap<String, Person>,
    workspaces: HashMap<String, Workspace>,
    budgets: HashMap<String, u64>,
    // (pubkey, workspace_uuid, role)
    roles: HashSet<(String, String, String)>,
    payments: Vec<PaymentHistory>,
    invoices: HashMap<String, InvoiceRecord>,
    next_payment_id: i64,
}

/// In-memory store backing tests and single-node deployments. All maps sit
/// behind one lock so the conditional debit stays atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers used by tests and fixtures.

    pub async fn add_bounty(&self, bounty: Bounty) {
        let mut inner = self.inner.write().await;
        inner.bounties.insert(bounty.id, bounty);
    }

    pub async fn add_person(&self, person: Person) {
        let mut inner = self.inner.write().await;
        inner.people.insert(person.owner_pubkey.clone(), person);
    }

    pub async fn add_workspace(&self, workspace: Workspace) {
        let mut inner = self.inner.write().await;
        inner.workspaces.insert(workspace.uuid.clone(), workspace);
    }

    pub async fn set_budget(&self, workspace_uuid: &str, amount_sat: u64) {
        let mut inner = self.inner.write().await;
        inner.budgets.insert(workspace_uuid.to_string(), amount_sat);
    }

    pub async fn grant_role(&self, pubkey: &str, workspace_uuid: &str, role: &str) {
        let mut inner = self.inner.write().await;
        inner.roles.insert((
            pubkey.to_string(),
            workspace_uuid.to_string(),
            role.to_string(),
        ));
    }

    /// Rewrite the creation time of a stored payment row. Cooldown tests use
    /// this to simulate a withdrawal made hours ago.
    pub async fn set_payment_created(&self, payment_id: i64, created: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if let Some(payment) = inner.payments.iter_mut().find(|p| p.id == payment_id) {
            payment.created = created;
        }
    }

    pub async fn payments(&self) -> Vec<PaymentHistory> {
        self.inner.read().await.payments.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn bounty(&self, id: i64) -> Result<Option<Bounty>> {
        Ok(self.inner.read().await.bounties.get(&id).cloned())
    }

    async fn bounty_by_created(&self, created: i64) -> Result<Option<Bounty>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bounties
            .values()
            .find(|b| b.created == created)
            .cloned())
    }

    async fn mark_bounty_paid(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let bounty = inner
            .bounties
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("bounty {} not found", id))?;
        let now = Utc::now();
        bounty.paid = true;
        bounty.completed = true;
        bounty.payment_pending = false;
        bounty.payment_failed = false;
        bounty.paid_date = Some(now);
        bounty.completion_date = Some(now);
        bounty.updated = now;
        Ok(())
    }

    async fn mark_bounty_payment_pending(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let bounty = inner
            .bounties
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("bounty {} not found", id))?;
        bounty.payment_pending = true;
        bounty.payment_failed = false;
        bounty.updated = Utc::now();
        Ok(())
    }

    async fn mark_bounty_payment_failed(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let bounty = inner
            .bounties
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("bounty {} not found", id))?;
        bounty.payment_failed = true;
        bounty.payment_pending = false;
        bounty.updated = Utc::now();
        Ok(())
    }

    async fn person_by_pubkey(&self, pubkey: &str) -> Result<Option<Person>> {
        Ok(self.inner.read().await.people.get(pubkey).cloned())
    }

    async fn workspace(&self, uuid: &str) -> Result<Option<Workspace>> {
        Ok(self.inner.read().await.workspaces.get(uuid).cloned())
    }

    async fn user_has_access(
        &self,
        pubkey: &str,
        workspace_uuid: &str,
        role: &str,
    ) -> Result<bool> {
        let inner = self.inner.read().await;
        if let Some(workspace) = inner.workspaces.get(workspace_uuid) {
            // Owners hold every role implicitly.
            if workspace.owner_pubkey == pubkey {
                return Ok(true);
            }
        }
        Ok(inner.roles.contains(&(
            pubkey.to_string(),
            workspace_uuid.to_string(),
            role.to_string(),
        )))
    }

    async fn workspace_budget(&self, workspace_uuid: &str) -> Result<WorkspaceBudget> {
        let inner = self.inner.read().await;
        Ok(WorkspaceBudget {
            workspace_uuid: workspace_uuid.to_string(),
            total_budget: inner.budgets.get(workspace_uuid).copied().unwrap_or(0),
        })
    }

    async fn credit_budget(&self, workspace_uuid: &str, amount_sat: u64) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let budget = inner.budgets.entry(workspace_uuid.to_string()).or_insert(0);
        *budget += amount_sat;
        Ok(*budget)
    }

    async fn debit_budget_if_available(
        &self,
        workspace_uuid: &str,
        amount_sat: u64,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let budget = inner.budgets.entry(workspace_uuid.to_string()).or_insert(0);
        if *budget < amount_sat {
            return Ok(false);
        }
        *budget -= amount_sat;
        Ok(true)
    }

    async fn append_payment(&self, payment: NewPaymentHistory) -> Result<PaymentHistory> {
        let mut inner = self.inner.write().await;
        inner.next_payment_id += 1;
        let now = Utc::now();
        let row = PaymentHistory {
            id: inner.next_payment_id,
            bounty_id: payment.bounty_id,
            workspace_uuid: payment.workspace_uuid,
            amount: payment.amount,
            payment_type: payment.payment_type,
            status: payment.status,
            sender_pubkey: payment.sender_pubkey,
            receiver_pubkey: payment.receiver_pubkey,
            tag: payment.tag,
            payment_request: payment.payment_request,
            error: payment.error,
            created: now,
            updated: now,
        };
        inner.payments.push(row.clone());
        Ok(row)
    }

    async fn update_payment_status(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        error: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let payment = inner
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| anyhow::anyhow!("payment {} not found", payment_id))?;
        payment.status = status;
        if let Some(error) = error {
            payment.error = error;
        }
        payment.updated = Utc::now();
        Ok(())
    }

    async fn pending_payment_by_bounty(&self, bounty_id: i64) -> Result<Option<PaymentHistory>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .rev()
            .find(|p| {
                p.bounty_id == bounty_id
                    && p.payment_type == PaymentType::Payment
                    && p.status == PaymentStatus::Pending
            })
            .cloned())
    }

    async fn last_withdrawal(&self, workspace_uuid: &str) -> Result<Option<PaymentHistory>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| {
                p.payment_type == PaymentType::Withdraw && p.workspace_uuid == workspace_uuid
            })
            .max_by_key(|p| p.created)
            .cloned())
    }

    async fn add_invoice(&self, invoice: InvoiceRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .invoices
            .insert(invoice.payment_request.clone(), invoice);
        Ok(())
    }

    async fn invoice(&self, payment_request: &str) -> Result<Option<InvoiceRecord>> {
        Ok(self.inner.read().await.invoices.get(payment_request).cloned())
    }

    async fn settle_invoice(&self, payment_request: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.invoices.get_mut(payment_request) {
            Some(invoice) if !invoice.settled => {
                invoice.settled = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unsettled_invoices(&self) -> Result<Vec<InvoiceRecord>> {
        let inner = self.inner.read().await;
        let mut invoices: Vec<InvoiceRecord> = inner
            .invoices
            .values()
            .filter(|i| !i.settled)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.created);
        Ok(invoices)
    }
}
