use std::future::ready;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use axum::extract::{MatchedPath, Request};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use router::handlers::bounty;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::health::{health_check, liveness_check, readiness_check};
use crate::metrics::{api_metrics, describe_metrics};
use crate::ws::websocket_handler;

mod auth;
mod config;
mod gateway;
mod ledger;
mod observability;
mod operations;
mod store;
mod ws;

mod error;
mod events;
mod health;
mod metrics;
mod router;
mod services;
mod state;
mod types;
mod utils;

use auth::jwt_auth_middleware;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use config::Config;
use console::{style, Term};
use observability::{create_request_id_middleware, init_logging, LoggingConfig};
use state::AppState;

#[derive(Parser)]
#[clap(version)]
struct Cli {
    /// Data directory path (contains config and logs)
    #[clap(long, env = "BOUNTYD_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Server address (overrides config)
    #[clap(long, env = "BOUNTYD_ADDR")]
    addr: Option<String>,

    /// v1 relay node base URL (overrides config)
    #[clap(long, env = "BOUNTYD_RELAY_URL")]
    relay_url: Option<String>,

    /// v1 relay auth key (overrides config)
    #[clap(long, env = "BOUNTYD_RELAY_AUTH_KEY")]
    relay_auth_key: Option<String>,

    /// v2 payment bot base URL (overrides config)
    #[clap(long, env = "BOUNTYD_V2_BOT_URL")]
    v2_bot_url: Option<String>,

    /// v2 payment bot admin token (overrides config)
    #[clap(long, env = "BOUNTYD_V2_BOT_TOKEN")]
    v2_bot_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli: Cli = Cli::parse();

    // Initialize structured logging
    let log_config = LoggingConfig {
        level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        log_dir: cli.data_dir.join("logs"),
        console_output: std::env::var("NO_CONSOLE_LOG").is_err(),
        file_output: std::env::var("NO_FILE_LOG").is_err(),
        ..Default::default()
    };
    init_logging(log_config)?;

    tracing::info!("Starting bountyd with structured logging and observability");

    // Ensure data directory exists
    std::fs::create_dir_all(&cli.data_dir)?;

    // Config file is always in data_dir
    let config_path = cli.data_dir.join("bountyd.conf");

    // Load or create configuration file with automatic secret generation
    let term = Term::stdout();
    let (mut config, secret_generated) = Config::load_or_create(&config_path)?;

    if secret_generated {
        term.write_line(&format!(
            "{}{}",
            style("Generating token signing secret...").yellow(),
            style("done").white()
        ))?;
    }

    // Override config with CLI arguments
    if let Some(addr) = cli.addr {
        // Parse address to extract IP and port
        if let Some((ip, port_str)) = addr.split_once(':') {
            config.http_bind_ip = ip.to_string();
            if let Ok(port) = port_str.parse::<u16>() {
                config.http_bind_port = port;
            }
        }
    }
    if let Some(relay_url) = cli.relay_url {
        config.relay_url = Some(relay_url);
    }
    if let Some(relay_auth_key) = cli.relay_auth_key {
        config.relay_auth_key = Some(relay_auth_key);
    }
    if let Some(v2_bot_url) = cli.v2_bot_url {
        config.v2_bot_url = Some(v2_bot_url);
    }
    if let Some(v2_bot_token) = cli.v2_bot_token {
        config.v2_bot_token = Some(v2_bot_token);
    }

    let state = AppState::new(&config).await?;

    // Start the settlement sweep for full reconciliation parity
    if let Err(e) = state.start_services().await {
        tracing::warn!("Failed to start background services: {}", e);
    } else {
        tracing::info!("Background services started successfully");
    }

    start_main_server(&config, state).await?;
    Ok(())
}

async fn start_main_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let jwt = state.jwt.clone();
    let event_bus = state.event_bus.clone();

    // Payment routes all sit behind token auth; invoice data lookup and the
    // websocket upgrade are open, matching the frontend's expectations.
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

    info!("Starting server with token authentication enabled");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers(Any);

    // Initialize the metrics system
    describe_metrics();
    let metrics_handle = setup_metrics_recorder()?;

    let app = Router::new()
        .nest("/gobounties", authed.merge(open))
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .route("/metrics", get(move || ready(metrics_handle.render())))
        .with_state(state)
        .layer(middleware::from_fn(create_request_id_middleware(
            config.rate_limiting.clone(),
        )))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .route_layer(middleware::from_fn(track_metrics));

    let addr = config.http_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("bountyd listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn setup_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    Ok(PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_requests_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .install_recorder()?)
}

async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status_code = response.status().as_u16();

    api_metrics::record_api_request(&method.to_string(), &path, status_code, duration);

    response
}
