use axum::extract::{Extension, State};
use axum::Json;
use chrono::Utc;
use tracing::{info, instrument};

use crate::auth::{AuthContext, ROLE_WITHDRAW_BUDGET};
use crate::error::AppError;
use crate::events::BountyEvent;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_invoice;
use crate::state::AppState;
use crate::store::NewPaymentHistory;
use crate::types::{PaymentStatus, PaymentSuccess, PaymentType, WithdrawBudgetRequest};
use crate::utils::invoice_amount_sats;

#[instrument(
    skip(state, req, context),
    fields(
        workspace_uuid = %req.workspace_uuid,
        pubkey = %pubkey,
        amount_sat = tracing::field::Empty,
    )
)]
async fn _withdraw(
    state: &AppState,
    pubkey: &str,
    req: WithdrawBudgetRequest,
    context: RequestContext,
) -> Result<PaymentSuccess, AppError> {
    let span = tracing::Span::current();

    let has_access = state
        .store
        .user_has_access(pubkey, &req.workspace_uuid, ROLE_WITHDRAW_BUDGET)
        .await?;
    if !has_access {
        return Err(AppError::authentication_error(
            "You don't have appropriate permissions to withdraw bounty budget",
        )
        .with_context(context));
    }

    if let Some(last) = state.store.last_withdrawal(&req.workspace_uuid).await? {
        let hours_since = (Utc::now() - last.created).num_hours();
        if hours_since < state.withdraw_cooldown_hours {
            return Err(AppError::withdrawal_cooldown(
                "Your last withdrawal is not more than an hour ago",
            )
            .with_context(context));
        }
    }

    let amount = invoice_amount_sats(&req.payment_request);
    span.record("amount_sat", amount);
    if amount == 0 {
        return Err(AppError::insufficient_budget("Sats value can not be 0").with_context(context));
    }

    // Budget check, gateway call and debit run under the workspace lock, the
    // same section bounty payments serialize on.
    let _guard = state.ledger.lock_workspace(&req.workspace_uuid).await;

    if !state.ledger.can_cover(&req.workspace_uuid, amount).await? {
        return Err(AppError::insufficient_budget(
            "Workspace budget is not enough to withdraw the amount",
        )
        .with_context(context));
    }

    let _ = state
        .event_bus
        .publish(BountyEvent::WithdrawalInitiated {
            workspace_uuid: req.workspace_uuid.clone(),
            pubkey: pubkey.to_string(),
            amount_sat: amount,
            correlation_id: Some(context.correlation_id.clone()),
            timestamp: Utc::now(),
        })
        .await;

    info!(
        invoice = %sanitize_invoice(&req.payment_request),
        amount_sat = amount,
        "Paying withdrawal invoice"
    );
    let outcome = state.gateway.pay_invoice(&req.payment_request).await;

    if !outcome.success {
        let _ = state
            .event_bus
            .publish(BountyEvent::WithdrawalFailed {
                workspace_uuid: req.workspace_uuid.clone(),
                reason: outcome.error.clone(),
                correlation_id: Some(context.correlation_id.clone()),
                timestamp: Utc::now(),
            })
            .await;
        return Err(AppError::payment_failed(outcome.error).with_context(context));
    }

    let debited = state
        .ledger
        .debit(
            &req.workspace_uuid,
            amount,
            Some(context.correlation_id.clone()),
        )
        .await?;
    if !debited {
        // Cannot happen while the lock is held; refuse rather than overdraw.
        return Err(
            AppError::internal_error("budget debit refused after gateway call")
                .with_context(context),
        );
    }

    state
        .store
        .append_payment(NewPaymentHistory {
            bounty_id: 0,
            workspace_uuid: req.workspace_uuid.clone(),
            amount,
            payment_type: PaymentType::Withdraw,
            status: PaymentStatus::Complete,
            sender_pubkey: pubkey.to_string(),
            receiver_pubkey: pubkey.to_string(),
            tag: String::new(),
            payment_request: req.payment_request.clone(),
            error: String::new(),
        })
        .await?;

    let _ = state
        .event_bus
        .publish(BountyEvent::WithdrawalSucceeded {
            workspace_uuid: req.workspace_uuid.clone(),
            amount_sat: amount,
            correlation_id: Some(context.correlation_id.clone()),
            timestamp: Utc::now(),
        })
        .await;

    info!(
        workspace_uuid = %req.workspace_uuid,
        amount_sat = amount,
        "Budget withdrawal complete"
    );

    Ok(PaymentSuccess {
        success: true,
        response: outcome.into(),
    })
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(context): Extension<RequestContext>,
    body: String,
) -> Result<Json<PaymentSuccess>, AppError> {
    // Parse by hand so malformed bodies reject with 406, the contract the
    // withdrawal clients rely on.
    let req: WithdrawBudgetRequest = serde_json::from_str(&body)?;
    let success = _withdraw(&state, &auth.pubkey, req, context).await?;
    Ok(Json(success))
}
