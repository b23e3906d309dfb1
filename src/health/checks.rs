use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Overall health state of a component or the entire system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Component is functioning normally
    Healthy,
    /// Component has issues but is still functional
    Degraded,
    /// Component is not functional
    Unhealthy,
}

/// Health status for an individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Current health state
    pub status: HealthState,
    /// Human-readable status message
    pub message: Option<String>,
    /// When this check was last performed
    pub last_check: DateTime<Utc>,
    /// Additional metadata about the component
    pub metadata: Option<serde_json::Value>,
    /// Duration of the health check in milliseconds
    pub check_duration_ms: Option<u64>,
}

impl ComponentHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Healthy,
            message: Some(message.into()),
            last_check: Utc::now(),
            metadata: None,
            check_duration_ms: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Degraded,
            message: Some(message.into()),
            last_check: Utc::now(),
            metadata: None,
            check_duration_ms: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            message: Some(message.into()),
            last_check: Utc::now(),
            metadata: None,
            check_duration_ms: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.check_duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

/// Complete health status including all components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall system health state
    pub status: HealthState,
    /// Application version
    pub version: String,
    /// System uptime in seconds
    pub uptime_seconds: u64,
    /// Timestamp of this health check
    pub timestamp: DateTime<Utc>,
    /// Health status of individual components
    pub checks: HashMap<String, ComponentHealth>,
    /// Summary statistics
    pub summary: HealthSummary,
}

/// Summary statistics for the health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Total number of components checked
    pub total_checks: usize,
    /// Number of healthy components
    pub healthy_count: usize,
    /// Number of degraded components
    pub degraded_count: usize,
    /// Number of unhealthy components
    pub unhealthy_count: usize,
    /// Total time taken for all health checks in milliseconds
    pub total_check_duration_ms: u64,
}

/// Comprehensive health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, StatusCode> {
    let start_time = Instant::now();
    let mut checks = HashMap::new();
    let timestamp = Utc::now();

    debug!("Starting comprehensive health check");

    let store_check_start = Instant::now();
    let store_health = check_store_health(&state).await;
    checks.insert(
        "store".to_string(),
        store_health.with_duration(store_check_start.elapsed()),
    );

    let gateway_check_start = Instant::now();
    let gateway_health = check_gateway_health(&state).await;
    checks.insert(
        "gateway".to_string(),
        gateway_health.with_duration(gateway_check_start.elapsed()),
    );

    let event_check_start = Instant::now();
    let event_bus_health = check_event_bus_health(&state).await;
    checks.insert(
        "event_bus".to_string(),
        event_bus_health.with_duration(event_check_start.elapsed()),
    );

    let sweep_check_start = Instant::now();
    let sweep_health = check_sweep_health(&state).await;
    checks.insert(
        "settlement_sweep".to_string(),
        sweep_health.with_duration(sweep_check_start.elapsed()),
    );

    let ws_check_start = Instant::now();
    let ws_health = check_ws_pool_health(&state).await;
    checks.insert(
        "websocket_pool".to_string(),
        ws_health.with_duration(ws_check_start.elapsed()),
    );

    let overall_status = determine_overall_health(&checks);

    let total_duration = start_time.elapsed();
    let summary = calculate_health_summary(&checks, total_duration);

    let health_status = HealthStatus {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp,
        checks,
        summary,
    };

    info!(
        overall_status = ?health_status.status,
        total_checks = health_status.summary.total_checks,
        healthy_count = health_status.summary.healthy_count,
        degraded_count = health_status.summary.degraded_count,
        unhealthy_count = health_status.summary.unhealthy_count,
        duration_ms = total_duration.as_millis(),
        "Health check completed"
    );

    match health_status.status {
        HealthState::Healthy => Ok(Json(health_status)),
        HealthState::Degraded => {
            warn!("System is in degraded state but still operational");
            Ok(Json(health_status))
        }
        HealthState::Unhealthy => {
            error!("System health check failed - returning 503 Service Unavailable");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Kubernetes liveness probe endpoint
pub async fn liveness_check(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    debug!("Performing liveness check");

    if let Err(e) = check_store_connectivity(&state).await {
        error!("Liveness check failed - store connectivity issue: {}", e);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    debug!("Liveness check passed");
    Ok("alive")
}

/// Kubernetes readiness probe endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    debug!("Performing readiness check");

    let store_health = check_store_health(&state).await;
    if matches!(store_health.status, HealthState::Unhealthy) {
        warn!("Readiness check failed - store is unhealthy");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    debug!("Readiness check passed");
    Ok("ready")
}

/// Check store health with a real query
async fn check_store_health(state: &AppState) -> ComponentHealth {
    let start = Instant::now();

    match state.store.unsettled_invoices().await {
        Ok(unsettled) => {
            ComponentHealth::healthy("Store is functioning normally").with_metadata(
                serde_json::json!({
                    "unsettled_invoices": unsettled.len(),
                    "query_time_ms": start.elapsed().as_millis(),
                }),
            )
        }
        Err(e) => ComponentHealth::unhealthy(format!("Store query failed: {}", e)).with_metadata(
            serde_json::json!({
                "error": e.to_string(),
                "query_time_ms": start.elapsed().as_millis(),
            }),
        ),
    }
}

/// Check basic store connectivity
async fn check_store_connectivity(state: &AppState) -> anyhow::Result<()> {
    let _ = state.store.workspace_budget("liveness-probe").await?;
    Ok(())
}

/// Report the configured payment gateway strategy. The gateway client is
/// resolved once at startup, so this never spends a round trip against the
/// node.
async fn check_gateway_health(state: &AppState) -> ComponentHealth {
    let strategy = state.gateway.name();
    ComponentHealth::healthy(format!("Payment gateway {} is configured", strategy)).with_metadata(
        serde_json::json!({
            "strategy": strategy,
        }),
    )
}

/// Check event bus health
async fn check_event_bus_health(state: &AppState) -> ComponentHealth {
    let stats = state.event_bus.stats().await;
    ComponentHealth::healthy("Event bus is functioning normally").with_metadata(
        serde_json::json!({
            "capacity": stats.capacity,
            "handler_count": stats.handler_count,
            "critical_handler_count": stats.critical_handler_count,
        }),
    )
}

/// Check the settlement sweep service
async fn check_sweep_health(state: &AppState) -> ComponentHealth {
    let stats = state.sweep.get_stats();
    ComponentHealth::healthy("Settlement sweep is running").with_metadata(serde_json::json!({
        "sweeps_run": stats.sweeps_run,
        "invoices_checked": stats.invoices_checked,
        "invoices_settled": stats.invoices_settled,
        "check_failures": stats.check_failures,
    }))
}

/// Check the websocket client pool
async fn check_ws_pool_health(state: &AppState) -> ComponentHealth {
    let connected = state.ws_pool.connected_clients().await;
    ComponentHealth::healthy("Websocket pool is available").with_metadata(serde_json::json!({
        "connected_clients": connected,
    }))
}

/// Determine overall health based on component health states
fn determine_overall_health(checks: &HashMap<String, ComponentHealth>) -> HealthState {
    if checks.is_empty() {
        return HealthState::Unhealthy;
    }

    let has_unhealthy = checks
        .values()
        .any(|c| matches!(c.status, HealthState::Unhealthy));
    let has_degraded = checks
        .values()
        .any(|c| matches!(c.status, HealthState::Degraded));

    if has_unhealthy {
        HealthState::Unhealthy
    } else if has_degraded {
        HealthState::Degraded
    } else {
        HealthState::Healthy
    }
}

/// Calculate health check summary statistics
fn calculate_health_summary(
    checks: &HashMap<String, ComponentHealth>,
    total_duration: Duration,
) -> HealthSummary {
    let total_checks = checks.len();
    let healthy_count = checks
        .values()
        .filter(|c| matches!(c.status, HealthState::Healthy))
        .count();
    let degraded_count = checks
        .values()
        .filter(|c| matches!(c.status, HealthState::Degraded))
        .count();
    let unhealthy_count = checks
        .values()
        .filter(|c| matches!(c.status, HealthState::Unhealthy))
        .count();

    HealthSummary {
        total_checks,
        healthy_count,
        degraded_count,
        unhealthy_count,
        total_check_duration_ms: total_duration.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_health_creation() {
        let healthy = ComponentHealth::healthy("All good");
        assert_eq!(healthy.status, HealthState::Healthy);
        assert_eq!(healthy.message, Some("All good".to_string()));
        assert!(healthy.metadata.is_none());

        let degraded = ComponentHealth::degraded("Some issues")
            .with_metadata(serde_json::json!({"issue": "slow response"}));
        assert_eq!(degraded.status, HealthState::Degraded);
        assert!(degraded.metadata.is_some());

        let unhealthy = ComponentHealth::unhealthy("System down");
        assert_eq!(unhealthy.status, HealthState::Unhealthy);
    }

    #[test]
    fn test_determine_overall_health() {
        let mut checks = HashMap::new();

        // All healthy
        checks.insert("store".to_string(), ComponentHealth::healthy("OK"));
        checks.insert("gateway".to_string(), ComponentHealth::healthy("OK"));
        assert_eq!(determine_overall_health(&checks), HealthState::Healthy);

        // One degraded
        checks.insert("event_bus".to_string(), ComponentHealth::degraded("Slow"));
        assert_eq!(determine_overall_health(&checks), HealthState::Degraded);

        // One unhealthy
        checks.insert("sweep".to_string(), ComponentHealth::unhealthy("Down"));
        assert_eq!(determine_overall_health(&checks), HealthState::Unhealthy);

        // Empty checks
        checks.clear();
        assert_eq!(determine_overall_health(&checks), HealthState::Unhealthy);
    }

    #[test]
    fn test_health_summary_calculation() {
        let mut checks = HashMap::new();
        checks.insert("healthy1".to_string(), ComponentHealth::healthy("OK"));
        checks.insert("healthy2".to_string(), ComponentHealth::healthy("OK"));
        checks.insert("degraded1".to_string(), ComponentHealth::degraded("Slow"));
        checks.insert("unhealthy1".to_string(), ComponentHealth::unhealthy("Down"));

        let summary = calculate_health_summary(&checks, Duration::from_millis(500));

        assert_eq!(summary.total_checks, 4);
        assert_eq!(summary.healthy_count, 2);
        assert_eq!(summary.degraded_count, 1);
        assert_eq!(summary.unhealthy_count, 1);
        assert_eq!(summary.total_check_duration_ms, 500);
    }

    #[test]
    fn test_component_health_with_duration() {
        let duration = Duration::from_millis(250);
        let health = ComponentHealth::healthy("OK").with_duration(duration);

        assert_eq!(health.check_duration_ms, Some(250));
    }
}
