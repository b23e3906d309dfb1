#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Duration;

    use crate::events::{BountyEvent, EventBus};
    use crate::observability::correlation::RequestContext;
    use crate::operations::payment::*;

    fn create_test_context() -> RequestContext {
        RequestContext::new(Some("test_correlation".to_string()))
    }

    #[tokio::test]
    async fn test_payment_tracker_creation() {
        let event_bus = Arc::new(EventBus::new(100));
        let context = create_test_context();

        let tracker = PaymentTracker::new(
            42,
            "workspace-uuid",
            "lnbc1000n1pwjw8xepp5...",
            1000,
            event_bus,
            Some(&context),
        );

        assert_eq!(*tracker.state(), PaymentState::Requested);
        assert!(!tracker.payment_id().is_empty());
        assert_eq!(tracker.correlation_id().map(String::as_str), Some("test_correlation"));
    }

    #[tokio::test]
    async fn test_payment_id_derivation() {
        let seed1 = "lnbc1000n1pwjw8xepp5test1";
        let seed2 = "lnbc2000n1pwjw8xepp5test2";

        let id1 = PaymentTracker::derive_payment_id(seed1);
        let id2 = PaymentTracker::derive_payment_id(seed2);

        // IDs should be deterministic
        assert_eq!(id1, PaymentTracker::derive_payment_id(seed1));

        // Different seeds should produce different IDs
        assert_ne!(id1, id2);

        // IDs should be hex strings of expected length (32 chars = 16 bytes)
        assert_eq!(id1.len(), 32);
        assert_eq!(id2.len(), 32);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(id2.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_payment_lifecycle_to_complete() {
        let event_bus = Arc::new(EventBus::new(100));
        let context = create_test_context();

        let mut tracker = PaymentTracker::new(
            42,
            "workspace-uuid",
            "lnbc1000n1pwjw8xepp5test",
            1000,
            event_bus,
            Some(&context),
        );

        tracker.initiate().await;
        assert_eq!(*tracker.state(), PaymentState::Requested);
        assert!(!tracker.is_terminal());

        tracker.authorized();
        assert_eq!(*tracker.state(), PaymentState::Authorized);
        assert!(!tracker.is_terminal());

        tracker.gateway_called("relay");
        assert_eq!(*tracker.state(), PaymentState::GatewayCalled);
        assert!(!tracker.is_terminal());

        tracker.complete().await;
        assert_eq!(*tracker.state(), PaymentState::Complete);
        assert!(tracker.is_terminal());
    }

    #[tokio::test]
    async fn test_payment_pending_is_terminal() {
        let event_bus = Arc::new(EventBus::new(100));
        let mut rx = event_bus.subscribe();

        let mut tracker =
            PaymentTracker::new(7, "workspace-uuid", "seed", 500, event_bus.clone(), None);

        tracker.initiate().await;
        tracker.authorized();
        tracker.gateway_called("v2-bot");
        tracker.pending("tag-123".to_string()).await;

        assert_eq!(*tracker.state(), PaymentState::Pending);
        assert!(tracker.is_terminal());

        // First event is the initiation, second carries the tag.
        let _ = rx.recv().await.unwrap();
        match rx.recv().await.unwrap() {
            BountyEvent::PaymentPending { tag, bounty_id, .. } => {
                assert_eq!(tag, "tag-123");
                assert_eq!(bounty_id, 7);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_payment_failure() {
        let event_bus = Arc::new(EventBus::new(100));
        let context = create_test_context();

        let mut tracker = PaymentTracker::new(
            42,
            "workspace-uuid",
            "lnbc1000n1pwjw8xepp5test",
            1000,
            event_bus,
            Some(&context),
        );

        tracker.initiate().await;
        tracker.fail("Test failure reason".to_string()).await;

        assert_eq!(*tracker.state(), PaymentState::Failed);
        assert!(tracker.is_terminal());
    }

    #[tokio::test]
    async fn test_payment_duration() {
        let event_bus = Arc::new(EventBus::new(100));

        let mut tracker = PaymentTracker::new(1, "ws", "seed", 10, event_bus, None);

        // Small delay to ensure duration > 0
        tokio::time::sleep(Duration::from_millis(10)).await;

        let duration = tracker.duration();
        assert!(duration.num_milliseconds() > 0);

        tracker.fail("done".to_string()).await;
    }

    #[tokio::test]
    async fn test_payment_state_string_conversion() {
        assert_eq!(PaymentState::Requested.as_str(), "requested");
        assert_eq!(PaymentState::Authorized.as_str(), "authorized");
        assert_eq!(PaymentState::GatewayCalled.as_str(), "gateway_called");
        assert_eq!(PaymentState::Complete.as_str(), "complete");
        assert_eq!(PaymentState::Pending.as_str(), "pending");
        assert_eq!(PaymentState::Failed.as_str(), "failed");
    }

    #[tokio::test]
    async fn test_tracker_with_no_context() {
        let event_bus = Arc::new(EventBus::new(100));

        let mut tracker = PaymentTracker::new(9, "ws", "seed", 10, event_bus, None);

        assert!(tracker.correlation_id().is_none());
        tracker.fail("cleanup".to_string()).await;
    }
}
