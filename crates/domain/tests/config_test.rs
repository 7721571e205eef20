use ferrous_orb_domain::config::{CacheConcurrency, CliOverrides, Config, ConfigError, LogFormat};

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.logging.level, "info");
    assert!(config.load.endpoints.is_empty());
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = Config::from_toml_str(
        r#"
[outbound]
cache_type = "edge"
high_water_mark = 2
"#,
    )
    .unwrap();

    assert_eq!(config.outbound.cache_type, "edge");
    assert_eq!(config.outbound.high_water_mark, 2);
    assert_eq!(config.outbound.number_to_reclaim, 8);
    assert_eq!(config.inbound.cache_type, "server-inbound");
    assert_eq!(config.load.threads, 8);
}

#[test]
fn test_concurrency_parsed_from_toml() {
    let config = Config::from_toml_str(
        r#"
[inbound]
cache_type = "acceptor"
concurrency = "non_blocking"
"#,
    )
    .unwrap();

    assert_eq!(config.inbound.concurrency, CacheConcurrency::NonBlocking);
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let err = Config::from_toml_str("[outbound\nhigh_water_mark = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_validate_rejects_zero_threads() {
    let mut config = Config::default();
    config.load.threads = 0;

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_propagates_cache_errors() {
    let mut config = Config::default();
    config.outbound.max_parallel_connections = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("max_parallel_connections"));
}

#[test]
fn test_cli_overrides_applied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orb.toml");
    Config::default().save(path.to_str().unwrap()).unwrap();

    let config = Config::load(
        path.to_str(),
        CliOverrides {
            log_level: Some("debug".to_string()),
            threads: Some(2),
            iterations: Some(10),
            concurrency: Some(CacheConcurrency::Blocking),
            endpoints: vec!["127.0.0.1:9000".to_string()],
        },
    )
    .unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.load.threads, 2);
    assert_eq!(config.load.iterations, 10);
    assert_eq!(config.outbound.concurrency, CacheConcurrency::Blocking);
    assert_eq!(config.inbound.concurrency, CacheConcurrency::Blocking);
    assert_eq!(config.load.endpoints, vec!["127.0.0.1:9000".to_string()]);
}

#[test]
fn test_save_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orb.toml");

    let mut config = Config::default();
    config.outbound.high_water_mark = 3;
    config.inbound.number_to_reclaim = 1;
    config.save(path.to_str().unwrap()).unwrap();

    let loaded = Config::load(path.to_str(), CliOverrides::default()).unwrap();
    assert_eq!(loaded.outbound.high_water_mark, 3);
    assert_eq!(loaded.inbound.number_to_reclaim, 1);
}

#[test]
fn test_missing_file_is_read_error() {
    let err = Config::load(Some("/nonexistent/ferrous-orb.toml"), CliOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileRead { .. }));
    assert_eq!(err.path(), Some("/nonexistent/ferrous-orb.toml"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_save_into_missing_directory_is_write_error() {
    let err = Config::default()
        .save("/nonexistent/dir/ferrous-orb.toml")
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileWrite { .. }));
    assert_eq!(err.path(), Some("/nonexistent/dir/ferrous-orb.toml"));
}

#[test]
fn test_logging_format_parses() {
    let config = Config::from_toml_str(
        r#"
[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(Config::default().logging.format, LogFormat::Text);

    let err = Config::from_toml_str("[logging]\nformat = \"xml\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert_eq!(err.path(), None);
}
