use std::sync::Once;

use metrics::{describe_counter, describe_histogram};
use tracing::info;

// Define metric names as constants to avoid typos
pub const PAYMENTS_TOTAL: &str = "bountyd_payments_total";
pub const PAYMENT_AMOUNT_SATS: &str = "bountyd_payment_amount_sats";

pub const WITHDRAWALS_TOTAL: &str = "bountyd_withdrawals_total";
pub const WITHDRAWAL_AMOUNT_SATS: &str = "bountyd_withdrawal_amount_sats";

pub const BUDGET_OPERATIONS_TOTAL: &str = "bountyd_budget_operations_total";

pub const INVOICES_TOTAL: &str = "bountyd_invoices_total";
pub const INVOICE_AMOUNT_SATS: &str = "bountyd_invoice_amount_sats";

pub const STORE_QUERIES_TOTAL: &str = "bountyd_store_queries_total";
pub const STORE_QUERY_DURATION_SECONDS: &str = "bountyd_store_query_duration_seconds";

pub const AUTH_ATTEMPTS_TOTAL: &str = "bountyd_auth_attempts_total";

pub const WS_CLIENTS_TOTAL: &str = "bountyd_ws_clients_total";

pub const EVENT_BUS_EVENTS_TOTAL: &str = "bountyd_event_bus_events_total";

// The HTTP pair is unprefixed so the recorder's histogram buckets and the
// standard dashboards pick it up.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUESTS_DURATION_SECONDS: &str = "http_requests_duration_seconds";

static METRICS_DESCRIBED: Once = Once::new();

/// Attach help text to every metric this service emits. Callers may invoke
/// this more than once; descriptions are registered a single time.
pub fn describe_metrics() {
    METRICS_DESCRIBED.call_once(|| {
        describe_counter!(PAYMENTS_TOTAL, "Total number of bounty payment attempts");
        describe_histogram!(PAYMENT_AMOUNT_SATS, "Bounty payment amounts in satoshis");

        describe_counter!(
            WITHDRAWALS_TOTAL,
            "Total number of budget withdrawal attempts"
        );
        describe_histogram!(
            WITHDRAWAL_AMOUNT_SATS,
            "Budget withdrawal amounts in satoshis"
        );

        describe_counter!(
            BUDGET_OPERATIONS_TOTAL,
            "Total workspace budget debits and credits"
        );

        describe_counter!(INVOICES_TOTAL, "Total number of invoice operations");
        describe_histogram!(INVOICE_AMOUNT_SATS, "Invoice amounts in satoshis");

        describe_counter!(STORE_QUERIES_TOTAL, "Total store queries");
        describe_histogram!(
            STORE_QUERY_DURATION_SECONDS,
            "Store query duration in seconds"
        );

        describe_counter!(AUTH_ATTEMPTS_TOTAL, "Total authentication attempts");

        describe_counter!(
            WS_CLIENTS_TOTAL,
            "Websocket client registrations and drops"
        );

        describe_counter!(
            EVENT_BUS_EVENTS_TOTAL,
            "Total events published to the event bus"
        );

        describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
        describe_histogram!(
            HTTP_REQUESTS_DURATION_SECONDS,
            "HTTP request duration in seconds"
        );

        info!("All Prometheus metrics described");
    });
}

/// Utility functions for recording API metrics from middleware
pub mod api_metrics {
    use std::time::Duration;

    use metrics::{counter, histogram};
    use tracing::debug;

    use super::*;

    /// Record API request metrics
    pub fn record_api_request(method: &str, path: &str, status_code: u16, duration: Duration) {
        let status_class = match status_code {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            500..=599 => "5xx",
            _ => "unknown",
        };

        counter!(
            HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "endpoint" => path.to_string(),
            "status" => status_class.to_string()
        )
        .increment(1);

        histogram!(
            HTTP_REQUESTS_DURATION_SECONDS,
            "method" => method.to_string(),
            "endpoint" => path.to_string()
        )
        .record(duration.as_secs_f64());

        debug!(
            method = %method,
            path = %path,
            status_code = status_code,
            duration_ms = duration.as_millis(),
            "Recorded API request metrics"
        );
    }
}
