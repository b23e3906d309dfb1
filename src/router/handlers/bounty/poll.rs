use axum::extract::{Extension, Path, State};
use axum::Json;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_invoice;
use crate::services::settlement::apply_settlement;
use crate::state::AppState;
use crate::types::PaymentSuccess;

#[instrument(
    skip(state, payment_request, context),
    fields(invoice = %sanitize_invoice(&payment_request))
)]
async fn _poll(
    state: &AppState,
    payment_request: String,
    context: RequestContext,
) -> Result<PaymentSuccess, AppError> {
    let details = state
        .gateway
        .check_invoice(&payment_request)
        .await
        .map_err(|e| e.with_context(context.clone()))?;

    if details.settled {
        apply_settlement(
            &state.store,
            &state.ledger,
            &state.event_bus,
            &payment_request,
            Some(context.correlation_id.clone()),
        )
        .await?;
    }

    Ok(PaymentSuccess {
        success: details.success,
        response: details.into(),
    })
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(payment_request): Path<String>,
) -> Result<Json<PaymentSuccess>, AppError> {
    let result = _poll(&state, payment_request, context).await?;
    Ok(Json(result))
}
