// Library exports for testing and external use
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod health;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod operations;
pub mod router;
pub mod services;
pub mod state;
pub mod store;
pub mod types;
pub mod utils;
pub mod ws;
