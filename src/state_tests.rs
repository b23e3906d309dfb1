#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::*;

    fn relay_config() -> Config {
        Config {
            jwt_secret: Some("test-secret".to_string()),
            relay_url: Some("http://127.0.0.1:3355".to_string()),
            relay_auth_key: Some("relay-key".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = AppState::new(&relay_config()).await;
        assert!(state.is_ok(), "Should create AppState successfully");

        let state = state.unwrap();
        assert_eq!(state.gateway.name(), "relay");
        assert_eq!(state.ws_pool.connected_clients().await, 0);
        assert_eq!(state.event_bus.handler_count().await, 2);
    }

    #[tokio::test]
    async fn test_app_state_selects_bot_gateway() {
        let config = Config {
            jwt_secret: Some("test-secret".to_string()),
            v2_bot_url: Some("http://127.0.0.1:8444".to_string()),
            v2_bot_token: Some("bot-token".to_string()),
            ..Default::default()
        };

        let state = AppState::new(&config).await.unwrap();
        assert_eq!(state.gateway.name(), "v2-bot");
    }

    #[tokio::test]
    async fn test_app_state_requires_gateway() {
        let config = Config {
            jwt_secret: Some("test-secret".to_string()),
            ..Default::default()
        };

        let result = AppState::new(&config).await;
        assert!(result.is_err(), "Should fail without a gateway configured");
    }

    #[tokio::test]
    async fn test_app_state_requires_secret() {
        let config = Config {
            relay_url: Some("http://127.0.0.1:3355".to_string()),
            ..Default::default()
        };

        let result = AppState::new(&config).await;
        assert!(result.is_err(), "Should fail without a signing secret");
    }

    #[tokio::test]
    async fn test_services_start_and_stop() {
        let state = AppState::new(&relay_config()).await.unwrap();
        state.start_services().await.unwrap();
        state.stop_services().await.unwrap();
        assert!(state.uptime() < std::time::Duration::from_secs(5));
    }
}
