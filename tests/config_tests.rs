use bountyd::config::Config;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.http_bind_port, 5002);
    assert!(config.jwt_secret.is_none());
    assert!(config.relay_url.is_none());
    assert_eq!(config.gateway_timeout_secs, 10);
    assert_eq!(config.withdraw_cooldown_hours, 1);
    assert_eq!(config.sweep_interval_secs, 30);
    assert!(!config.has_v2_bot());
}

#[test]
fn test_v2_bot_selection() {
    let mut config = Config::default();
    config.v2_bot_url = Some("http://bot:3000".to_string());
    // Both settings must be present
    assert!(!config.has_v2_bot());

    config.v2_bot_token = Some("admin-token".to_string());
    assert!(config.has_v2_bot());
}

#[test]
fn test_config_address() {
    // The bind IP depends on the environment, the port does not
    let config = Config::default();
    assert!(config.http_address().ends_with(":5002"));
}

#[test]
fn test_config_save_load() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("test.toml");

    let mut original_config = Config::default();
    original_config.jwt_secret = Some("testsecret".to_string());
    original_config.relay_url = Some("http://relay:3000".to_string());
    original_config.http_bind_port = 8080;

    // Save config
    original_config.save_to_file(&config_path).unwrap();

    // Load config
    let loaded_config = Config::load_from_file(&config_path).unwrap();

    assert_eq!(loaded_config.jwt_secret, Some("testsecret".to_string()));
    assert_eq!(loaded_config.relay_url, Some("http://relay:3000".to_string()));
    assert_eq!(loaded_config.http_bind_port, 8080);
}

#[test]
fn test_generate_secret() {
    let secret1 = Config::generate_secret();
    let secret2 = Config::generate_secret();

    // Secrets should be different
    assert_ne!(secret1, secret2);

    // Should be 64 hex characters (32 bytes * 2 hex chars per byte)
    assert_eq!(secret1.len(), 64);
    assert_eq!(secret2.len(), 64);

    // Should be valid hex
    assert!(secret1.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(secret2.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_load_or_create_new_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("new_config.toml");

    // File doesn't exist
    assert!(!config_path.exists());

    // Load or create should create file and generate a signing secret
    let (config, secret_generated) = Config::load_or_create(&config_path).unwrap();

    assert!(config_path.exists());
    assert!(secret_generated);
    assert!(config.jwt_secret.is_some());

    let secret = config.jwt_secret.unwrap();
    assert_eq!(secret.len(), 64);
    assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));

    // Verify the file contains the secret
    let file_contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(file_contents.contains(&format!("jwt-secret = \"{}\"", secret)));
}

#[test]
fn test_load_or_create_existing_file_with_secret() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("existing_config.toml");

    // Create a config with a secret
    let mut original_config = Config::default();
    original_config.jwt_secret = Some("existingsecret".to_string());
    original_config.save_to_file(&config_path).unwrap();

    // Load or create should not generate a new secret
    let (config, secret_generated) = Config::load_or_create(&config_path).unwrap();

    assert!(!secret_generated);
    assert_eq!(config.jwt_secret, Some("existingsecret".to_string()));
}

#[test]
fn test_load_or_create_existing_file_without_secret() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config_no_secret.toml");

    // Create a config without a secret
    let original_config = Config::default();
    original_config.save_to_file(&config_path).unwrap();

    // Load or create should generate one
    let (config, secret_generated) = Config::load_or_create(&config_path).unwrap();

    assert!(secret_generated);
    assert!(config.jwt_secret.is_some());

    let secret = config.jwt_secret.unwrap();
    assert_eq!(secret.len(), 64);

    // Verify the file was updated with the secret
    let file_contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(file_contents.contains(&format!("jwt-secret = \"{}\"", secret)));
}
