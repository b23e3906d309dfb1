pub mod invoices;
pub mod pay;
pub mod poll;
pub mod status;
pub mod withdraw;

use crate::state::AppState;
use crate::ws::TicketMessage;

/// Memo attached to outgoing bounty payments, visible in the recipient's
/// wallet.
pub(crate) fn payment_memo(title: &str) -> String {
    format!("Payment For: {}", title)
}

/// Push a payment outcome to the requester's websocket session, if one is
/// registered. Payment state is already persisted by the time this runs, so
/// a missing or dead connection is silently accepted.
pub(crate) async fn push_payment_notification(state: &AppState, host: &str, message: &str) {
    if host.is_empty() {
        return;
    }
    let notification = TicketMessage::direct(host, message, "payment");
    state.ws_pool.send_ticket(host, &notification).await;
}
