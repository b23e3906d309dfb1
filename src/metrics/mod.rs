pub mod collectors;

pub use collectors::api_metrics;
pub use collectors::{
    describe_metrics, AUTH_ATTEMPTS_TOTAL, BUDGET_OPERATIONS_TOTAL, EVENT_BUS_EVENTS_TOTAL,
    HTTP_REQUESTS_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, INVOICES_TOTAL, INVOICE_AMOUNT_SATS,
    PAYMENTS_TOTAL, PAYMENT_AMOUNT_SATS, STORE_QUERIES_TOTAL, STORE_QUERY_DURATION_SECONDS,
    WITHDRAWALS_TOTAL, WITHDRAWAL_AMOUNT_SATS, WS_CLIENTS_TOTAL,
};
