//! Loading configuration files from disk and building the service from them.

use std::fs;

use tempfile::TempDir;

use notia::config::{load_config, write_config, ModelBackend};
use notia::{Config, ConfigError, NotiaService};

#[test]
fn test_load_minimal_config_applies_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"version": "1.0"}"#).unwrap();

    let config = load_config(&path).unwrap();

    assert!(config.mailbox.is_none());
    assert_eq!(config.model.backend, ModelBackend::Keyword);
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "version": "1.0",
            "database_path": "/tmp/notia-test.db",
            "mailbox": {
                "host": "imap.example.com",
                "username": "me@example.com",
                "password_env_var": "NOTIA_TEST_IMAP_PASSWORD",
                "batch_size": 5,
                "poll_interval_secs": 0
            },
            "model": {
                "backend": "openai",
                "endpoint": "http://localhost:11434/v1",
                "model_name": "qwen2.5"
            },
            "server": {"port": 9000}
        }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    let mailbox = config.ready_mailbox().unwrap();
    assert_eq!(mailbox.batch_size, 5);
    assert_eq!(mailbox.port, 993);
    assert_eq!(mailbox.folder, "INBOX");
    assert_eq!(config.model.backend, ModelBackend::Openai);
    assert_eq!(config.server.port, 9000);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let result = load_config(dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
}

#[test]
fn test_unknown_field_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"version": "1.0", "mailbx": {}}"#).unwrap();

    let result = load_config(&path);
    assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
}

#[test]
fn test_written_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    write_config(&path, &Config::default()).unwrap();
    let loaded = load_config(&path).unwrap();

    assert_eq!(loaded.version, "1.0");
    assert_eq!(loaded.model.backend, ModelBackend::Keyword);
}

#[test]
fn test_service_from_config_creates_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("notia.db");
    let config = Config {
        database_path: Some(db_path.display().to_string()),
        ..Default::default()
    };

    let service = NotiaService::from_config(config).unwrap();

    assert!(db_path.exists());
    assert_eq!(service.model_name(), "keyword");
    assert_eq!(service.statistics().unwrap().total_emails, 0);
}
