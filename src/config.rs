use std::path::Path;

use anyhow::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::observability::correlation::RateLimitConfig;

/// Configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server bind IP address
    #[serde(rename = "http-bind-ip", default = "default_bind_ip")]
    pub http_bind_ip: String,

    /// HTTP server bind port
    #[serde(rename = "http-bind-port", default = "default_bind_port")]
    pub http_bind_port: u16,

    /// Signing secret for auth tokens (hex)
    /// When None, a secret is generated on first run
    #[serde(rename = "jwt-secret")]
    pub jwt_secret: Option<String>,

    /// Base URL of the v1 relay node
    #[serde(rename = "relay-url")]
    pub relay_url: Option<String>,

    /// Auth key sent to the v1 relay in the x-user-token header
    #[serde(rename = "relay-auth-key")]
    pub relay_auth_key: Option<String>,

    /// Base URL of the v2 payment bot
    #[serde(rename = "v2-bot-url")]
    pub v2_bot_url: Option<String>,

    /// Admin token sent to the v2 bot in the x-admin-token header
    #[serde(rename = "v2-bot-token")]
    pub v2_bot_token: Option<String>,

    /// Upper bound on any single gateway HTTP call, in seconds
    #[serde(rename = "gateway-timeout-secs", default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Minimum gap between two budget withdrawals from the same workspace
    #[serde(
        rename = "withdraw-cooldown-hours",
        default = "default_withdraw_cooldown"
    )]
    pub withdraw_cooldown_hours: i64,

    /// Interval between background invoice settlement sweeps, in seconds
    #[serde(rename = "sweep-interval-secs", default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Rate limiting configuration for correlation IDs
    #[serde(rename = "rate-limiting", default)]
    pub rate_limiting: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_ip: default_bind_ip(),
            http_bind_port: default_bind_port(),
            jwt_secret: None,
            relay_url: None,
            relay_auth_key: None,
            v2_bot_url: None,
            v2_bot_token: None,
            gateway_timeout_secs: default_gateway_timeout(),
            withdraw_cooldown_hours: default_withdraw_cooldown(),
            sweep_interval_secs: default_sweep_interval(),
            rate_limiting: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists (important for Docker volumes)
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file atomically
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists (important for Docker volumes)
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;

        // Write to temporary file first
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;

        // Atomically rename temp file to actual config file
        // This ensures the config file is never in a partially written state
        match std::fs::rename(&temp_path, path) {
            Ok(_) => Ok(()),
            Err(e) => {
                // Clean up temp file if rename failed
                let _ = std::fs::remove_file(&temp_path);
                Err(e.into())
            }
        }
    }

    /// Get the complete HTTP server address
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_bind_ip, self.http_bind_port)
    }

    /// True when both v2 bot settings are present, selecting the v2 gateway
    pub fn has_v2_bot(&self) -> bool {
        self.v2_bot_url.is_some() && self.v2_bot_token.is_some()
    }

    /// Generate a secure random 32-byte hex secret
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Load or create configuration file with automatic secret generation
    /// Uses atomic file operations to prevent secret loss on crash
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        let mut secret_generated = false;

        // Ensure parent directory exists (important for Docker volumes)
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut config = if path.exists() {
            match Self::load_from_file(path) {
                Ok(cfg) => cfg,
                Err(_) => {
                    // If config file is corrupted, recreate it
                    let cfg = Self::default();
                    cfg.save_to_file(path)?;
                    cfg
                }
            }
        } else {
            let config = Self::default();
            config.save_to_file(path)?;
            config
        };

        // Check if we need to generate the signing secret
        if config.jwt_secret.is_none() {
            let generated_secret = Self::generate_secret();
            config.jwt_secret = Some(generated_secret);
            secret_generated = true;

            // Save the complete config with the secret properly in the structure
            config.save_to_file(path)?;
        }

        Ok((config, secret_generated))
    }
}

// Default value functions
fn default_bind_ip() -> String {
    // Use 0.0.0.0 in containerized environments to allow external connections
    // Check for common container environment indicators
    if std::env::var("DOCKER_CONTAINER").is_ok()
        || std::env::var("BOUNTYD_ADDR").is_ok()
        || std::path::Path::new("/.dockerenv").exists()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
    {
        "0.0.0.0".to_string()
    } else {
        "127.0.0.1".to_string()
    }
}

fn default_bind_port() -> u16 {
    5002
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_withdraw_cooldown() -> i64 {
    1
}

fn default_sweep_interval() -> u64 {
    30
}
