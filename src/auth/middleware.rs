use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{info, warn};

use super::jwt::JwtAuth;
use crate::events::{BountyEvent, EventBus};
use crate::observability::correlation::RequestContext;

/// Pubkey extracted from a verified token, available to handlers running
/// behind [`jwt_auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub pubkey: String,
}

/// The `token` query parameter wins over the `x-jwt` header; empty values
/// count as absent either way.
fn token_from_request(request: &Request) -> Option<String> {
    let query_token = request
        .uri()
        .query()
        .and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|t| !t.is_empty());

    query_token.or_else(|| {
        request
            .headers()
            .get("x-jwt")
            .and_then(|h| h.to_str().ok())
            .map(String::from)
            .filter(|t| !t.is_empty())
    })
}

fn unauthorized() -> Response {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .body(Body::from("Unauthorized"))
        .unwrap_or_else(|_| Response::new(Body::from("Unauthorized")))
}

/// Token auth middleware with event publishing. Verified requests carry an
/// [`AuthContext`] extension into the handler.
pub async fn jwt_auth_middleware(
    auth: Arc<JwtAuth>,
    event_bus: Arc<EventBus>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Get or create request context
    let context = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::new(None));

    // Publish authentication attempt event helper function
    let publish_auth_event = |pubkey: Option<String>, success: bool, reason: Option<String>| {
        let event_bus = event_bus.clone();
        let path = path.clone();
        let correlation_id = context.correlation_id.clone();

        tokio::spawn(async move {
            let event = BountyEvent::AuthenticationAttempt {
                pubkey,
                endpoint: path,
                success,
                reason,
                correlation_id: Some(correlation_id),
                timestamp: Utc::now(),
            };
            if let Err(e) = event_bus.publish(event).await {
                warn!("Failed to publish authentication event: {}", e);
            }
        });
    };

    let token = match token_from_request(&request) {
        Some(token) => token,
        None => {
            warn!(
                method = %method,
                path = %path,
                auth_result = "failure",
                failure_reason = "missing_token",
                correlation_id = %context.correlation_id,
                "Authentication failed - no token"
            );
            publish_auth_event(None, false, Some("missing_token".to_string()));
            return Ok(unauthorized());
        }
    };

    match auth.decode(&token) {
        Ok(claims) => {
            info!(
                method = %method,
                path = %path,
                auth_result = "success",
                auth_type = "jwt",
                pubkey = %claims.pubkey,
                correlation_id = %context.correlation_id,
                "Authentication successful"
            );
            publish_auth_event(Some(claims.pubkey.clone()), true, None);

            request.extensions_mut().insert(AuthContext {
                pubkey: claims.pubkey,
            });
            Ok(next.run(request).await)
        }
        Err(reason) => {
            warn!(
                method = %method,
                path = %path,
                auth_result = "failure",
                auth_type = "jwt",
                failure_reason = %reason,
                correlation_id = %context.correlation_id,
                "Authentication failed - invalid token"
            );
            publish_auth_event(None, false, Some(reason));
            Ok(unauthorized())
        }
    }
}
