use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;

use crate::auth::JwtAuth;
use crate::config::Config;
use crate::events::handlers::{LoggingEventHandler, MetricsEventHandler};
use crate::events::EventBus;
use crate::gateway::{self, PaymentGateway};
use crate::ledger::BudgetLedger;
use crate::services::{SettlementSweep, SweepConfig};
use crate::store::{InstrumentedStore, MemoryStore, Store};
use crate::ws::WsPool;

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

/// Broadcast capacity of the event bus. Slow subscribers past this many
/// buffered events start losing the oldest ones.
const EVENT_BUS_CAPACITY: usize = 1024;

/// Shared service graph handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<BudgetLedger>,
    pub event_bus: Arc<EventBus>,
    pub ws_pool: Arc<WsPool>,
    pub jwt: Arc<JwtAuth>,
    pub sweep: Arc<SettlementSweep>,
    pub withdraw_cooldown_hours: i64,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the full service graph from configuration. The store is wrapped
    /// in instrumentation so every query lands in the event stream.
    pub async fn new(config: &Config) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
        event_bus
            .register_handler(Arc::new(LoggingEventHandler::new(false)))
            .await;
        event_bus
            .register_handler(Arc::new(MetricsEventHandler::new("bountyd")))
            .await;

        let store: Arc<dyn Store> = Arc::new(InstrumentedStore::new(
            Arc::new(MemoryStore::new()),
            event_bus.clone(),
            "bountyd",
        ));

        let gateway = gateway::from_config(config)?;
        info!(strategy = gateway.name(), "Payment gateway resolved");

        Self::with_parts(store, gateway, event_bus, config)
    }

    /// Assemble state from explicit parts. Tests inject store and gateway
    /// doubles through here.
    pub fn with_parts(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        event_bus: Arc<EventBus>,
        config: &Config,
    ) -> Result<Self> {
        let secret = config
            .jwt_secret
            .clone()
            .ok_or_else(|| anyhow::anyhow!("jwt-secret is not configured"))?;

        let ledger = Arc::new(BudgetLedger::new(store.clone(), event_bus.clone()));
        let ws_pool = Arc::new(WsPool::new(event_bus.clone()));
        let sweep = Arc::new(SettlementSweep::new(
            store.clone(),
            gateway.clone(),
            ledger.clone(),
            event_bus.clone(),
            SweepConfig {
                poll_interval: Duration::from_secs(config.sweep_interval_secs),
            },
        ));

        Ok(Self {
            store,
            gateway,
            ledger,
            event_bus,
            ws_pool,
            jwt: Arc::new(JwtAuth::new(&secret)),
            sweep,
            withdraw_cooldown_hours: config.withdraw_cooldown_hours,
            start_time: Instant::now(),
        })
    }

    /// Start the background services
    pub async fn start_services(&self) -> Result<()> {
        self.sweep.start().await
    }

    /// Stop the background services
    pub async fn stop_services(&self) -> Result<()> {
        self.sweep.stop().await
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
