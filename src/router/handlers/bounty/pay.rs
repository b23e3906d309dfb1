use axum::extract::{Extension, Path, State};
use axum::Json;
use tracing::{info, instrument};

use crate::auth::{AuthContext, ROLE_PAY_BOUNTY};
use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::operations::PaymentTracker;
use crate::state::AppState;
use crate::store::NewPaymentHistory;
use crate::types::{PayBountyRequest, PaymentStatus, PaymentSuccess, PaymentType};

use super::{payment_memo, push_payment_notification};

#[instrument(
    skip(state, req, context),
    fields(
        bounty_id = id,
        pubkey = %pubkey,
        payment_id = tracing::field::Empty,
        payment_status = "requested",
    )
)]
async fn _pay(
    state: &AppState,
    id: i64,
    pubkey: &str,
    req: PayBountyRequest,
    context: RequestContext,
) -> Result<PaymentSuccess, AppError> {
    let span = tracing::Span::current();

    let bounty = state.store.bounty(id).await?.ok_or_else(|| {
        AppError::not_found(format!("bounty {} not found", id)).with_context(context.clone())
    })?;

    let has_access = state
        .store
        .user_has_access(pubkey, &bounty.workspace_uuid, ROLE_PAY_BOUNTY)
        .await?;
    if !has_access {
        return Err(AppError::authentication_error(
            "You don't have appropriate permissions to pay the bounty",
        )
        .with_context(context));
    }

    if bounty.paid {
        return Err(
            AppError::method_not_allowed("Bounty has already been paid").with_context(context)
        );
    }

    if bounty.assignee_pubkey.is_empty() {
        return Err(
            AppError::validation_error("bounty has no assignee to pay").with_context(context)
        );
    }

    let amount = bounty.price;
    let seed = format!("{}:{}", bounty.id, bounty.assignee_pubkey);
    let mut tracker = PaymentTracker::new(
        bounty.id,
        &bounty.workspace_uuid,
        &seed,
        amount,
        state.event_bus.clone(),
        Some(&context),
    );
    span.record("payment_id", tracker.payment_id());
    tracker.initiate().await;

    // Budget check, gateway call and ledger mutation all happen under the
    // workspace lock; concurrent spenders of the same budget line up here.
    let _guard = state.ledger.lock_workspace(&bounty.workspace_uuid).await;

    if !state
        .ledger
        .can_cover(&bounty.workspace_uuid, amount)
        .await?
    {
        tracker.fail("insufficient workspace budget".to_string()).await;
        span.record("payment_status", "refused");
        return Err(AppError::insufficient_budget(
            "workspace budget is not enough to pay the bounty",
        )
        .with_context(context));
    }
    tracker.authorized();

    let route_hint = match state.store.person_by_pubkey(&bounty.assignee_pubkey).await? {
        Some(person) => person.owner_route_hint,
        None => String::new(),
    };

    let memo = payment_memo(&bounty.title);
    tracker.gateway_called(state.gateway.name());
    let outcome = state
        .gateway
        .keysend(&bounty.assignee_pubkey, &route_hint, amount, &memo)
        .await;

    if !outcome.success {
        let reason = outcome.error.clone();
        state
            .store
            .append_payment(NewPaymentHistory {
                bounty_id: bounty.id,
                workspace_uuid: bounty.workspace_uuid.clone(),
                amount,
                payment_type: PaymentType::Payment,
                status: PaymentStatus::Failed,
                sender_pubkey: pubkey.to_string(),
                receiver_pubkey: bounty.assignee_pubkey.clone(),
                tag: outcome.tag.clone(),
                payment_request: String::new(),
                error: reason.clone(),
            })
            .await?;
        tracker.fail(reason.clone()).await;
        span.record("payment_status", "failed");
        push_payment_notification(state, &req.websocket_token, "keysend_error").await;
        return Err(AppError::payment_failed(reason).with_context(context));
    }

    // The gateway accepted the send, so the sats are leaving the node
    // whether it settles now or later. Debit up front; a payment that the
    // tag reconciliation later reports as failed is refunded there.
    let debited = state
        .ledger
        .debit(
            &bounty.workspace_uuid,
            amount,
            tracker.correlation_id().cloned(),
        )
        .await?;
    if !debited {
        // Cannot happen while the lock is held; refuse rather than overdraw.
        tracker.fail("budget debit refused".to_string()).await;
        return Err(
            AppError::internal_error("budget debit refused after gateway call")
                .with_context(context),
        );
    }

    if outcome.settled {
        state
            .store
            .append_payment(NewPaymentHistory {
                bounty_id: bounty.id,
                workspace_uuid: bounty.workspace_uuid.clone(),
                amount,
                payment_type: PaymentType::Payment,
                status: PaymentStatus::Complete,
                sender_pubkey: pubkey.to_string(),
                receiver_pubkey: bounty.assignee_pubkey.clone(),
                tag: outcome.tag.clone(),
                payment_request: outcome.payment_request.clone(),
                error: String::new(),
            })
            .await?;
        state.store.mark_bounty_paid(bounty.id).await?;
        tracker.complete().await;
        push_payment_notification(state, &req.websocket_token, "keysend_success").await;

        info!(
            bounty_id = bounty.id,
            amount_sat = amount,
            "Bounty paid"
        );

        Ok(PaymentSuccess {
            success: true,
            response: outcome.into(),
        })
    } else {
        state
            .store
            .append_payment(NewPaymentHistory {
                bounty_id: bounty.id,
                workspace_uuid: bounty.workspace_uuid.clone(),
                amount,
                payment_type: PaymentType::Payment,
                status: PaymentStatus::Pending,
                sender_pubkey: pubkey.to_string(),
                receiver_pubkey: bounty.assignee_pubkey.clone(),
                tag: outcome.tag.clone(),
                payment_request: outcome.payment_request.clone(),
                error: String::new(),
            })
            .await?;
        state.store.mark_bounty_payment_pending(bounty.id).await?;
        tracker.pending(outcome.tag.clone()).await;

        info!(
            bounty_id = bounty.id,
            amount_sat = amount,
            tag = %outcome.tag,
            "Bounty payment pending"
        );

        Ok(PaymentSuccess {
            success: true,
            response: outcome.into(),
        })
    }
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
    body: Option<Json<PayBountyRequest>>,
) -> Result<Json<PaymentSuccess>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let success = _pay(&state, id, &auth.pubkey, req, context).await?;
    Ok(Json(success))
}
