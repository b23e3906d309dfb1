use axum::extract::{Extension, Path, State};
use axum::Json;
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::events::BountyEvent;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_invoice;
use crate::state::AppState;
use crate::types::{
    BudgetInvoiceRequest, BudgetInvoiceResponse, CreatedInvoice, InvoiceRecord, InvoiceType,
};

#[instrument(
    skip(state, req, context),
    fields(workspace_uuid = %req.workspace_uuid, amount_sat = req.amount)
)]
async fn _budget_invoice(
    state: &AppState,
    req: BudgetInvoiceRequest,
    context: RequestContext,
) -> Result<BudgetInvoiceResponse, AppError> {
    if state.store.workspace(&req.workspace_uuid).await?.is_none() {
        return Err(
            AppError::not_found(format!("workspace {} not found", req.workspace_uuid))
                .with_context(context),
        );
    }

    let memo = format!("Budget deposit for workspace {}", req.workspace_uuid);
    let bolt11 = state
        .gateway
        .create_invoice(req.amount, &memo)
        .await
        .map_err(|e| e.with_context(context.clone()))?;

    state
        .store
        .add_invoice(InvoiceRecord {
            payment_request: bolt11.clone(),
            invoice_type: InvoiceType::Budget,
            amount: req.amount,
            workspace_uuid: req.workspace_uuid.clone(),
            owner_pubkey: req.sender_pubkey.clone(),
            bounty_id: 0,
            settled: false,
            created: Utc::now(),
        })
        .await?;

    let _ = state
        .event_bus
        .publish(BountyEvent::InvoiceCreated {
            payment_request: bolt11.clone(),
            invoice_type: InvoiceType::Budget,
            amount_sat: req.amount,
            workspace_uuid: req.workspace_uuid.clone(),
            correlation_id: Some(context.correlation_id.clone()),
            timestamp: Utc::now(),
        })
        .await;

    info!(
        workspace_uuid = %req.workspace_uuid,
        amount_sat = req.amount,
        invoice = %sanitize_invoice(&bolt11),
        "Budget deposit invoice created"
    );

    Ok(BudgetInvoiceResponse {
        success: true,
        response: CreatedInvoice { invoice: bolt11 },
    })
}

#[axum_macros::debug_handler]
pub async fn handle_budget_invoice(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    body: String,
) -> Result<Json<BudgetInvoiceResponse>, AppError> {
    // Malformed bodies reject with 406 like the withdrawal endpoint.
    let req: BudgetInvoiceRequest = serde_json::from_str(&body)?;
    let response = _budget_invoice(&state, req, context).await?;
    Ok(Json(response))
}

/// Stored invoice lookup, the open endpoint clients use to render payment
/// state without polling the gateway.
#[axum_macros::debug_handler]
pub async fn handle_invoice_data(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(payment_request): Path<String>,
) -> Result<Json<InvoiceRecord>, AppError> {
    let invoice = state
        .store
        .invoice(&payment_request)
        .await?
        .ok_or_else(|| AppError::not_found("invoice not found").with_context(context))?;
    Ok(Json(invoice))
}
