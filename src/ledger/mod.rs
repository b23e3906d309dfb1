//! Workspace budget accounting.
//!
//! Every budget mutation runs through here. Callers that need a
//! check-then-act sequence (verify budget, call the gateway, then debit or
//! refund) take the workspace lock first, so concurrent operations against
//! the same workspace serialize while unrelated workspaces proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::events::{BountyEvent, EventBus};
use crate::store::Store;

pub struct BudgetLedger {
    store: Arc<dyn Store>,
    event_bus: Arc<EventBus>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl BudgetLedger {
    pub fn new(store: Arc<dyn Store>, event_bus: Arc<EventBus>) -> Self {
        Self {
            store,
            event_bus,
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Take the lock for a single workspace. The guard is owned so callers
    /// can hold it across gateway round trips.
    pub async fn lock_workspace(&self, workspace_uuid: &str) -> OwnedMutexGuard<()> {
        let existing = {
            let locks = self.locks.read().await;
            locks.get(workspace_uuid).cloned()
        };
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut locks = self.locks.write().await;
                locks
                    .entry(workspace_uuid.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            }
        };
        lock.lock_owned().await
    }

    pub async fn available(&self, workspace_uuid: &str) -> Result<u64> {
        Ok(self
            .store
            .workspace_budget(workspace_uuid)
            .await?
            .total_budget)
    }

    pub async fn can_cover(&self, workspace_uuid: &str, amount_sat: u64) -> Result<bool> {
        Ok(self.available(workspace_uuid).await? >= amount_sat)
    }

    /// Debit the workspace budget if it covers the amount. Returns whether
    /// the debit happened; an insufficient budget is not an error here.
    pub async fn debit(
        &self,
        workspace_uuid: &str,
        amount_sat: u64,
        correlation_id: Option<String>,
    ) -> Result<bool> {
        let debited = self
            .store
            .debit_budget_if_available(workspace_uuid, amount_sat)
            .await?;
        if !debited {
            debug!(
                workspace_uuid = %workspace_uuid,
                amount_sat = amount_sat,
                "Budget debit refused, amount exceeds balance"
            );
            return Ok(false);
        }

        let remaining = self.available(workspace_uuid).await?;
        let _ = self
            .event_bus
            .publish(BountyEvent::BudgetDebited {
                workspace_uuid: workspace_uuid.to_string(),
                amount_sat,
                remaining_sat: remaining,
                correlation_id,
                timestamp: Utc::now(),
            })
            .await;
        Ok(true)
    }

    /// Credit the workspace budget and return the new total. Used both for
    /// settled deposit invoices and for refunds after a failed send.
    pub async fn credit(
        &self,
        workspace_uuid: &str,
        amount_sat: u64,
        correlation_id: Option<String>,
    ) -> Result<u64> {
        let total = self.store.credit_budget(workspace_uuid, amount_sat).await?;
        let _ = self
            .event_bus
            .publish(BountyEvent::BudgetCredited {
                workspace_uuid: workspace_uuid.to_string(),
                amount_sat,
                total_sat: total,
                correlation_id,
                timestamp: Utc::now(),
            })
            .await;
        Ok(total)
    }
}
