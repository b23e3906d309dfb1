use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{info_span, instrument, Span};

use crate::events::{BountyEvent, EventBus};
use crate::observability::correlation::RequestContext;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentState {
    Requested,
    Authorized,
    GatewayCalled,
    Complete,
    Pending,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Requested => "requested",
            PaymentState::Authorized => "authorized",
            PaymentState::GatewayCalled => "gateway_called",
            PaymentState::Complete => "complete",
            PaymentState::Pending => "pending",
            PaymentState::Failed => "failed",
        }
    }
}

/// Tracks one payment request from authorization to its terminal state and
/// publishes lifecycle events along the way.
///
/// `Pending` is terminal here: the request is done, and the tag poller or the
/// settlement sweep picks the payment up from storage afterwards.
pub struct PaymentTracker {
    payment_id: String,
    bounty_id: i64,
    workspace_uuid: String,
    amount_sat: u64,
    state: PaymentState,
    event_bus: Arc<EventBus>,
    span: Span,
    correlation_id: Option<String>,
    initiated_at: DateTime<Utc>,
}

impl PaymentTracker {
    pub fn new(
        bounty_id: i64,
        workspace_uuid: &str,
        seed: &str,
        amount_sat: u64,
        event_bus: Arc<EventBus>,
        context: Option<&RequestContext>,
    ) -> Self {
        let payment_id = Self::derive_payment_id(seed);
        let correlation_id = context.map(|c| c.correlation_id.clone());
        let initiated_at = Utc::now();

        let span = info_span!(
            "payment_operation",
            payment_id = %payment_id,
            bounty_id = bounty_id,
            workspace_uuid = %workspace_uuid,
            amount_sat = amount_sat,
            state = %PaymentState::Requested.as_str(),
            correlation_id = ?correlation_id,
        );

        Self {
            payment_id,
            bounty_id,
            workspace_uuid: workspace_uuid.to_string(),
            amount_sat,
            state: PaymentState::Requested,
            event_bus,
            span,
            correlation_id,
            initiated_at,
        }
    }

    /// Derive a stable payment ID from the request that caused it, either the
    /// bolt11 string or a bounty/destination pair.
    pub fn derive_payment_id(seed: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    pub fn state(&self) -> &PaymentState {
        &self.state
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn correlation_id(&self) -> Option<&String> {
        self.correlation_id.as_ref()
    }

    /// Publish the initiation event. Called once the request has been parsed
    /// but before any checks run.
    #[instrument(skip(self), fields(payment_id = %self.payment_id))]
    pub async fn initiate(&mut self) {
        self.state = PaymentState::Requested;
        self.span.record("state", self.state.as_str());

        let event = BountyEvent::PaymentInitiated {
            payment_id: self.payment_id.clone(),
            bounty_id: self.bounty_id,
            workspace_uuid: self.workspace_uuid.clone(),
            amount_sat: self.amount_sat,
            correlation_id: self.correlation_id.clone(),
            timestamp: self.initiated_at,
        };

        if let Err(e) = self.event_bus.publish(event).await {
            tracing::error!(
                payment_id = %self.payment_id,
                error = ?e,
                "Failed to publish payment initiated event"
            );
        }
    }

    /// Access and budget checks passed.
    pub fn authorized(&mut self) {
        self.state = PaymentState::Authorized;
        self.span.record("state", self.state.as_str());
    }

    /// The gateway send is in flight.
    pub fn gateway_called(&mut self, gateway: &str) {
        self.state = PaymentState::GatewayCalled;
        self.span.record("state", self.state.as_str());
        self.span.record("gateway", gateway);
    }

    /// Funds verifiably moved.
    #[instrument(skip(self), fields(payment_id = %self.payment_id))]
    pub async fn complete(&mut self) {
        self.state = PaymentState::Complete;
        self.span.record("state", self.state.as_str());

        let duration = Utc::now().signed_duration_since(self.initiated_at);
        self.span.record("duration_ms", duration.num_milliseconds());

        let event = BountyEvent::PaymentSucceeded {
            payment_id: self.payment_id.clone(),
            bounty_id: self.bounty_id,
            workspace_uuid: self.workspace_uuid.clone(),
            amount_sat: self.amount_sat,
            correlation_id: self.correlation_id.clone(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.event_bus.publish(event).await {
            tracing::error!(
                payment_id = %self.payment_id,
                error = ?e,
                "Failed to publish payment succeeded event"
            );
        }
    }

    /// The gateway accepted the send but has not settled it. The tag is what
    /// later status checks poll.
    #[instrument(skip(self), fields(payment_id = %self.payment_id))]
    pub async fn pending(&mut self, tag: String) {
        self.state = PaymentState::Pending;
        self.span.record("state", self.state.as_str());
        self.span.record("tag", tag.as_str());

        let event = BountyEvent::PaymentPending {
            payment_id: self.payment_id.clone(),
            bounty_id: self.bounty_id,
            workspace_uuid: self.workspace_uuid.clone(),
            tag,
            correlation_id: self.correlation_id.clone(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.event_bus.publish(event).await {
            tracing::error!(
                payment_id = %self.payment_id,
                error = ?e,
                "Failed to publish payment pending event"
            );
        }
    }

    #[instrument(skip(self), fields(payment_id = %self.payment_id))]
    pub async fn fail(&mut self, reason: String) {
        self.state = PaymentState::Failed;
        self.span.record("state", self.state.as_str());
        self.span.record("failure_reason", reason.as_str());

        let duration = Utc::now().signed_duration_since(self.initiated_at);
        self.span.record("duration_ms", duration.num_milliseconds());

        let event = BountyEvent::PaymentFailed {
            payment_id: self.payment_id.clone(),
            bounty_id: self.bounty_id,
            workspace_uuid: self.workspace_uuid.clone(),
            reason,
            correlation_id: self.correlation_id.clone(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.event_bus.publish(event).await {
            tracing::error!(
                payment_id = %self.payment_id,
                error = ?e,
                "Failed to publish payment failed event"
            );
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            PaymentState::Complete | PaymentState::Pending | PaymentState::Failed
        )
    }

    pub fn duration(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.initiated_at)
    }
}

impl Drop for PaymentTracker {
    fn drop(&mut self) {
        // Ensure we don't leak unfinished payments
        if !self.is_terminal() {
            tracing::warn!(
                payment_id = %self.payment_id,
                state = %self.state.as_str(),
                "PaymentTracker dropped without reaching terminal state"
            );
        }
    }
}
