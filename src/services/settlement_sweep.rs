use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

use crate::events::EventBus;
use crate::gateway::PaymentGateway;
use crate::ledger::BudgetLedger;
use crate::observability::sanitize_invoice;
use crate::services::settlement::apply_settlement;
use crate::store::Store;

/// Configuration for the settlement sweep service
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to re-check unsettled invoices against the gateway
    pub poll_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
struct SweepCounters {
    sweeps_run: AtomicU64,
    invoices_checked: AtomicU64,
    invoices_settled: AtomicU64,
    check_failures: AtomicU64,
}

/// Statistics about the settlement sweep
#[derive(Debug, Clone, Serialize)]
pub struct SettlementSweepStats {
    pub sweeps_run: u64,
    pub invoices_checked: u64,
    pub invoices_settled: u64,
    pub check_failures: u64,
}

/// Background service that re-checks stored unsettled invoices against the
/// gateway and applies credits for the ones that settled while nobody was
/// polling. The poll endpoint and this sweep share one settlement routine,
/// so double credits cannot happen.
pub struct SettlementSweep {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<BudgetLedger>,
    event_bus: Arc<EventBus>,
    config: SweepConfig,
    counters: Arc<SweepCounters>,
    shutdown_tx: Arc<Mutex<Option<broadcast::Sender<()>>>>,
}

impl SettlementSweep {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<BudgetLedger>,
        event_bus: Arc<EventBus>,
        config: SweepConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            ledger,
            event_bus,
            config,
            counters: Arc::new(SweepCounters::default()),
            shutdown_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the background sweep task
    #[instrument(skip(self))]
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let (shutdown_tx, _) = broadcast::channel(1);
        {
            let mut tx_guard = self.shutdown_tx.lock().await;
            *tx_guard = Some(shutdown_tx.clone());
        }

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting settlement sweep service"
        );

        let sweep = Arc::clone(self);
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown_tx.subscribe();
            let mut poll_timer = interval(sweep.config.poll_interval);

            loop {
                tokio::select! {
                    _ = poll_timer.tick() => {
                        if let Err(e) = sweep.sweep_once().await {
                            error!(error = ?e, "Error during settlement sweep");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Settlement sweep received shutdown signal");
                        break;
                    }
                }
            }

            info!("Settlement sweep service stopped");
        });

        Ok(())
    }

    /// Stop the background sweep task
    pub async fn stop(&self) -> Result<()> {
        let tx_guard = self.shutdown_tx.lock().await;
        if let Some(shutdown_tx) = tx_guard.as_ref() {
            let _ = shutdown_tx.send(());
        }
        Ok(())
    }

    /// Run one sweep over all stored unsettled invoices
    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<()> {
        self.counters.sweeps_run.fetch_add(1, Ordering::Relaxed);

        let unsettled = self.store.unsettled_invoices().await?;
        if unsettled.is_empty() {
            debug!("No unsettled invoices to check");
            return Ok(());
        }

        debug!(
            unsettled = unsettled.len(),
            "Checking unsettled invoices against the gateway"
        );

        let mut settled = 0usize;
        for invoice in unsettled {
            self.counters.invoices_checked.fetch_add(1, Ordering::Relaxed);

            match self.gateway.check_invoice(&invoice.payment_request).await {
                Ok(details) if details.settled => {
                    match apply_settlement(
                        &self.store,
                        &self.ledger,
                        &self.event_bus,
                        &invoice.payment_request,
                        None,
                    )
                    .await
                    {
                        Ok(true) => {
                            settled += 1;
                            self.counters.invoices_settled.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(false) => {}
                        Err(e) => {
                            error!(
                                error = ?e,
                                invoice = %sanitize_invoice(&invoice.payment_request),
                                "Failed to apply settlement"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.counters.check_failures.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        error = %e,
                        invoice = %sanitize_invoice(&invoice.payment_request),
                        "Invoice check failed, leaving for the next sweep"
                    );
                }
            }
        }

        if settled > 0 {
            info!(settled, "Settlement sweep applied credits");
        }

        Ok(())
    }

    pub fn get_stats(&self) -> SettlementSweepStats {
        SettlementSweepStats {
            sweeps_run: self.counters.sweeps_run.load(Ordering::Relaxed),
            invoices_checked: self.counters.invoices_checked.load(Ordering::Relaxed),
            invoices_settled: self.counters.invoices_settled.load(Ordering::Relaxed),
            check_failures: self.counters.check_failures.load(Ordering::Relaxed),
        }
    }
}
