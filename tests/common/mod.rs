#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use bountyd::auth::jwt_auth_middleware;
use bountyd::config::Config;
use bountyd::error::AppError;
use bountyd::events::EventBus;
use bountyd::gateway::{PaymentGateway, PaymentOutcome, PaymentTagStatus};
use bountyd::observability::correlation::request_id_middleware;
use bountyd::router::handlers::bounty;
use bountyd::state::AppState;
use bountyd::store::{MemoryStore, Store};
use bountyd::types::{Bounty, Person, Workspace};
use bountyd::ws::websocket_handler;

/// One recorded keysend call, for asserting on what the handler sent.
#[derive(Debug, Clone)]
pub struct KeysendRequest {
    pub destination: String,
    pub route_hint: String,
    pub amount_sat: u64,
    pub memo: String,
}

/// Scriptable gateway double. Sends and settlement checks return whatever
/// the test configured, and every call is recorded.
pub struct MockGateway {
    keysend_outcome: Mutex<PaymentOutcome>,
    pay_invoice_outcome: Mutex<PaymentOutcome>,
    invoice_states: Mutex<HashMap<String, PaymentOutcome>>,
    tag_states: Mutex<HashMap<String, PaymentTagStatus>>,
    pub keysend_requests: Mutex<Vec<KeysendRequest>>,
    pub paid_invoices: Mutex<Vec<String>>,
    invoice_counter: AtomicU64,
}

impl MockGateway {
    /// A gateway where every send settles immediately.
    pub fn settling() -> Self {
        Self {
            keysend_outcome: Mutex::new(settled_outcome()),
            pay_invoice_outcome: Mutex::new(settled_outcome()),
            invoice_states: Mutex::new(HashMap::new()),
            tag_states: Mutex::new(HashMap::new()),
            keysend_requests: Mutex::new(Vec::new()),
            paid_invoices: Mutex::new(Vec::new()),
            invoice_counter: AtomicU64::new(0),
        }
    }

    pub fn set_keysend_outcome(&self, outcome: PaymentOutcome) {
        *self.keysend_outcome.lock().unwrap() = outcome;
    }

    pub fn set_pay_invoice_outcome(&self, outcome: PaymentOutcome) {
        *self.pay_invoice_outcome.lock().unwrap() = outcome;
    }

    /// Script what `check_invoice` reports for one payment request.
    pub fn set_invoice_state(&self, payment_request: &str, outcome: PaymentOutcome) {
        self.invoice_states
            .lock()
            .unwrap()
            .insert(payment_request.to_string(), outcome);
    }

    /// Script what `check_payment` reports for one gateway tag.
    pub fn set_tag_state(&self, tag: &str, status: PaymentTagStatus) {
        self.tag_states
            .lock()
            .unwrap()
            .insert(tag.to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn pay_invoice(&self, bolt11: &str) -> PaymentOutcome {
        self.paid_invoices.lock().unwrap().push(bolt11.to_string());
        let mut outcome = self.pay_invoice_outcome.lock().unwrap().clone();
        if outcome.payment_request.is_empty() {
            outcome.payment_request = bolt11.to_string();
        }
        outcome
    }

    async fn keysend(
        &self,
        destination: &str,
        route_hint: &str,
        amount_sat: u64,
        memo: &str,
    ) -> PaymentOutcome {
        self.keysend_requests.lock().unwrap().push(KeysendRequest {
            destination: destination.to_string(),
            route_hint: route_hint.to_string(),
            amount_sat,
            memo: memo.to_string(),
        });
        self.keysend_outcome.lock().unwrap().clone()
    }

    async fn create_invoice(&self, amount_sat: u64, _memo: &str) -> Result<String, AppError> {
        let n = self.invoice_counter.fetch_add(1, Ordering::SeqCst);
        // Amount sits in the hrp with the 'n' multiplier so the decoded
        // value round-trips; the suffix stays digit-free to keep the
        // separator unambiguous.
        Ok(format!("lnbc{}n1mock{}", amount_sat * 10, letters(n)))
    }

    async fn check_invoice(&self, payment_request: &str) -> Result<PaymentOutcome, AppError> {
        match self.invoice_states.lock().unwrap().get(payment_request) {
            Some(outcome) => Ok(outcome.clone()),
            None => Ok(PaymentOutcome {
                success: true,
                settled: false,
                payment_request: payment_request.to_string(),
                ..Default::default()
            }),
        }
    }

    async fn check_payment(&self, tag: &str) -> Result<PaymentTagStatus, AppError> {
        match self.tag_states.lock().unwrap().get(tag) {
            Some(status) => Ok(status.clone()),
            None => Ok(PaymentTagStatus::Pending),
        }
    }
}

pub fn settled_outcome() -> PaymentOutcome {
    PaymentOutcome {
        success: true,
        settled: true,
        payment_request: String::new(),
        payment_hash: "aa11".to_string(),
        preimage: "bb22".to_string(),
        amount: String::new(),
        tag: String::new(),
        error: String::new(),
    }
}

/// Accepted but unsettled, the shape a v2 send returns before the tag
/// reconciles.
pub fn pending_outcome(tag: &str) -> PaymentOutcome {
    PaymentOutcome {
        success: true,
        settled: false,
        tag: tag.to_string(),
        ..Default::default()
    }
}

fn letters(n: u64) -> String {
    n.to_string()
        .bytes()
        .map(|b| (b'a' + (b - b'0')) as char)
        .collect()
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: Some("0123456789abcdef0123456789abcdef".to_string()),
        relay_url: Some("http://localhost:3355".to_string()),
        relay_auth_key: Some("test-relay-key".to_string()),
        ..Default::default()
    }
}

/// A wired application plus direct handles on its doubles, for driving the
/// HTTP surface with `oneshot` while inspecting the store underneath.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub router: Router,
}

pub async fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::settling());
    let event_bus = Arc::new(EventBus::new(64));

    let state = AppState::with_parts(
        store.clone() as Arc<dyn Store>,
        gateway.clone() as Arc<dyn PaymentGateway>,
        event_bus,
        &test_config(),
    )
    .expect("test state should assemble");

    let router = build_router(&state);

    TestApp {
        state,
        store,
        gateway,
        router,
    }
}

/// The same route table the server assembles, minus health and metrics.
pub fn build_router(state: &AppState) -> Router {
    let jwt = state.jwt.clone();
    let event_bus = state.event_bus.clone();

    let authed = Router::new()
        .route("/pay/:id", post(bounty::pay::handle_rest))
        .route("/budget/withdraw", post(bounty::withdraw::handle_rest))
        .route(
            "/budgetinvoices",
            post(bounty::invoices::handle_budget_invoice),
        )
        .route(
            "/poll/invoice/:payment_request",
            get(bounty::poll::handle_rest),
        )
        .route("/paymentstatus/:created", post(bounty::status::handle_rest))
        .route_layer(middleware::from_fn(move |request, next| {
            jwt_auth_middleware(jwt.clone(), event_bus.clone(), request, next)
        }));

    let open = Router::new().route(
        "/invoice/:payment_request",
        get(bounty::invoices::handle_invoice_data),
    );

    Router::new()
        .nest("/gobounties", authed.merge(open))
        .route("/ws", get(websocket_handler))
        .with_state(state.clone())
        .layer(middleware::from_fn(request_id_middleware))
}

impl TestApp {
    pub fn token(&self, pubkey: &str) -> String {
        self.state.jwt.issue(pubkey).unwrap()
    }

    /// Seed a workspace with a budget and grant `pubkey` the given role.
    pub async fn seed_workspace(&self, uuid: &str, budget_sat: u64, pubkey: &str, role: &str) {
        self.store
            .add_workspace(Workspace {
                uuid: uuid.to_string(),
                name: format!("workspace {}", uuid),
                owner_pubkey: pubkey.to_string(),
            })
            .await;
        self.store.set_budget(uuid, budget_sat).await;
        self.store.grant_role(pubkey, uuid, role).await;
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send("POST", uri, token, Some(body.to_string())).await
    }

    /// POST with a raw, possibly malformed body.
    pub async fn post_raw(
        &self,
        uri: &str,
        token: Option<&str>,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        self.send("POST", uri, token, Some(body.to_string())).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        self.send("GET", uri, token, None).await
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-jwt", token);
        }
        let request = builder.body(Body::from(body.unwrap_or_default())).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should answer");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}

pub fn test_bounty(id: i64, workspace_uuid: &str, price: u64) -> Bounty {
    Bounty {
        id,
        owner_pubkey: "owner-pubkey".to_string(),
        assignee_pubkey: "assignee-pubkey".to_string(),
        workspace_uuid: workspace_uuid.to_string(),
        title: format!("Fix the flaky retry loop #{}", id),
        price,
        paid: false,
        payment_pending: false,
        payment_failed: false,
        completed: true,
        created: 1_700_000_000_000 + id,
        paid_date: None,
        completion_date: None,
        updated: Utc::now(),
    }
}

pub fn test_person(pubkey: &str) -> Person {
    Person {
        uuid: format!("person-{}", pubkey),
        owner_pubkey: pubkey.to_string(),
        owner_alias: "alice".to_string(),
        owner_route_hint: "02abc_1099527156737".to_string(),
    }
}
