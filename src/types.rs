// Common types used across the library and API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Standard result type used throughout the library
pub type BountydResult<T> = std::result::Result<T, AppError>;

/// A posted coding task with a sats price, payable once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounty {
    pub id: i64,
    pub owner_pubkey: String,
    pub assignee_pubkey: String,
    pub workspace_uuid: String,
    pub title: String,
    /// Price in sats.
    pub price: u64,
    pub paid: bool,
    pub payment_pending: bool,
    pub payment_failed: bool,
    pub completed: bool,
    /// Creation timestamp in unix milliseconds, also the public lookup key.
    pub created: i64,
    pub paid_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub updated: DateTime<Utc>,
}

/// Per-workspace spendable balance in sats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceBudget {
    pub workspace_uuid: String,
    pub total_budget: u64,
}

/// A tenant owning bounties and a shared budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub uuid: String,
    pub name: String,
    pub owner_pubkey: String,
}

/// Profile data consumed for payment destination lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub uuid: String,
    pub owner_pubkey: String,
    pub owner_alias: String,
    #[serde(default)]
    pub owner_route_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Payment,
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "COMPLETE")]
    Complete,
    #[serde(rename = "FAILED")]
    Failed,
}

/// One row per payment attempt; status updated on settlement confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub id: i64,
    pub bounty_id: i64,
    pub workspace_uuid: String,
    /// Amount in sats.
    pub amount: u64,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub sender_pubkey: String,
    pub receiver_pubkey: String,
    /// Gateway-assigned identifier for an in-flight v2 payment.
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub payment_request: String,
    #[serde(default)]
    pub error: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    #[serde(rename = "KEYSEND")]
    Keysend,
    #[serde(rename = "BUDGET")]
    Budget,
}

/// A stored bolt11 invoice awaiting settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub payment_request: String,
    pub invoice_type: InvoiceType,
    /// Amount in sats, decoded at creation time.
    pub amount: u64,
    pub workspace_uuid: String,
    pub owner_pubkey: String,
    /// Bounty to mark paid on settlement; only meaningful for keysend
    /// invoices.
    #[serde(default)]
    pub bounty_id: i64,
    pub settled: bool,
    pub created: DateTime<Utc>,
}

// Wire types shared between the gateway client and the HTTP layer. Field
// names match the relay's v1 envelope, which the frontend also consumes.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceDetails {
    pub settled: bool,
    pub payment_request: String,
    pub payment_hash: String,
    pub preimage: String,
    pub amount: String,
}

/// Success envelope returned by the pay, withdraw and poll endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSuccess {
    pub success: bool,
    pub response: InvoiceDetails,
}

/// Body of `POST /gobounties/budget/withdraw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawBudgetRequest {
    pub payment_request: String,
    pub workspace_uuid: String,
    #[serde(default)]
    pub websocket_token: String,
}

/// Body of `POST /gobounties/pay/{id}`. The token routes the outcome
/// notification back to the requester's websocket session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayBountyRequest {
    pub websocket_token: String,
}

/// Body of `POST /gobounties/budgetinvoices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetInvoiceRequest {
    pub amount: u64,
    pub workspace_uuid: String,
    pub sender_pubkey: String,
}

/// Response of `POST /gobounties/budgetinvoices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetInvoiceResponse {
    pub success: bool,
    pub response: CreatedInvoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedInvoice {
    pub invoice: String,
}
