use axum::extract::{Extension, Path, State};
use axum::Json;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::events::BountyEvent;
use crate::gateway::PaymentTagStatus;
use crate::observability::correlation::RequestContext;
use crate::operations::PaymentTracker;
use crate::state::AppState;
use crate::types::{InvoiceDetails, PaymentStatus, PaymentSuccess};

/// Reconcile a bounty payment the gateway accepted but did not settle in the
/// request that sent it. The stored pending row carries the gateway tag; the
/// tag's status decides whether the reserved sats stay spent or come back.
#[instrument(skip(state, context), fields(created = created))]
async fn _status(
    state: &AppState,
    created: i64,
    context: RequestContext,
) -> Result<PaymentSuccess, AppError> {
    let bounty = state
        .store
        .bounty_by_created(created)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("no bounty created at {}", created))
                .with_context(context.clone())
        })?;

    if bounty.paid {
        return Err(
            AppError::method_not_allowed("Bounty has already been paid").with_context(context)
        );
    }

    let pending = state
        .store
        .pending_payment_by_bounty(bounty.id)
        .await?
        .ok_or_else(|| {
            AppError::not_found("no pending payment for this bounty").with_context(context.clone())
        })?;

    if pending.tag.is_empty() {
        return Err(
            AppError::validation_error("pending payment carries no gateway tag")
                .with_context(context),
        );
    }

    let payment_id =
        PaymentTracker::derive_payment_id(&format!("{}:{}", bounty.id, pending.receiver_pubkey));

    match state
        .gateway
        .check_payment(&pending.tag)
        .await
        .map_err(|e| e.with_context(context.clone()))?
    {
        PaymentTagStatus::Complete => {
            state
                .store
                .update_payment_status(pending.id, PaymentStatus::Complete, None)
                .await?;
            state.store.mark_bounty_paid(bounty.id).await?;

            let _ = state
                .event_bus
                .publish(BountyEvent::PaymentSucceeded {
                    payment_id,
                    bounty_id: bounty.id,
                    workspace_uuid: bounty.workspace_uuid.clone(),
                    amount_sat: pending.amount,
                    correlation_id: Some(context.correlation_id.clone()),
                    timestamp: Utc::now(),
                })
                .await;

            info!(
                bounty_id = bounty.id,
                tag = %pending.tag,
                "Pending bounty payment confirmed"
            );

            Ok(PaymentSuccess {
                success: true,
                response: InvoiceDetails {
                    settled: true,
                    payment_request: pending.payment_request.clone(),
                    ..Default::default()
                },
            })
        }
        PaymentTagStatus::Pending => {
            Err(AppError::payment_failed("payment is still pending").with_context(context))
        }
        PaymentTagStatus::Failed { error } => {
            state
                .store
                .update_payment_status(pending.id, PaymentStatus::Failed, Some(error.clone()))
                .await?;
            state.store.mark_bounty_payment_failed(bounty.id).await?;

            // The send debited the budget when the gateway accepted it; a
            // failed settlement puts the sats back.
            state
                .ledger
                .credit(
                    &bounty.workspace_uuid,
                    pending.amount,
                    Some(context.correlation_id.clone()),
                )
                .await?;

            let _ = state
                .event_bus
                .publish(BountyEvent::PaymentFailed {
                    payment_id,
                    bounty_id: bounty.id,
                    workspace_uuid: bounty.workspace_uuid.clone(),
                    reason: error.clone(),
                    correlation_id: Some(context.correlation_id.clone()),
                    timestamp: Utc::now(),
                })
                .await;

            warn!(
                bounty_id = bounty.id,
                tag = %pending.tag,
                error = %error,
                "Pending bounty payment failed, budget refunded"
            );

            Err(AppError::payment_failed(error).with_context(context))
        }
    }
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(created): Path<i64>,
) -> Result<Json<PaymentSuccess>, AppError> {
    let result = _status(&state, created, context).await?;
    Ok(Json(result))
}
