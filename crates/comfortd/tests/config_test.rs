// Loading configuration files from disk.

use std::io::Write;
use std::time::Duration;

use comfortd::Cli;
use comfortd::Config;
use comfortd::ConfigError;
use comfortd::LogLevel;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
[logging]
level = "trace"

[cloud]
username = "user@example.com"
password = "secret"
update_interval = 30

[mqtt]
broker = "10.0.0.2"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.logging.level, LogLevel::Trace);
    assert_eq!(config.cloud.update_interval(), Duration::from_secs(30));
    assert_eq!(config.mqtt.broker, "10.0.0.2");
    assert_eq!(config.mqtt.port, 1883);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::from_file(&path).unwrap_err();
    match &err {
        ConfigError::Io { path: p, source } => {
            assert_eq!(p, &path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_parse_error_names_file() {
    let file = write_config("[mqtt\nbroker = \"x\"\n");

    let err = Config::from_file(file.path()).unwrap_err();
    let ConfigError::Parse { path, report } = err else {
        panic!("expected a parse error");
    };
    assert_eq!(path, file.path());
    assert!(!report.is_empty());
}

#[test]
fn test_flags_complete_file() {
    let file = write_config("[cloud]\nusername = \"user@example.com\"\n");
    let mut config = Config::from_file(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let cli = Cli {
        password: Some("secret".to_string()),
        topic: Some("ha".to_string()),
        ..Default::default()
    };
    cli.apply(&mut config);

    assert!(config.validate().is_ok());
    assert_eq!(config.cloud.username.as_deref(), Some("user@example.com"));
    assert_eq!(config.mqtt.discovery_prefix, "ha");
}
