//! Command line interface.
//!
//! Every flag can also be given through an environment variable. Values set
//! here win over the configuration file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::config::LogLevel;

#[derive(Debug, Default, Parser)]
#[command(name = "comfortd", version, about = "Panasonic Comfort Cloud to MQTT bridge")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comfort Cloud username
    #[arg(short, long, env = "USERNAME")]
    pub username: Option<String>,

    /// Comfort Cloud password
    #[arg(short = 'P', long, env = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// MQTT broker host
    #[arg(short, long, env = "MQTT")]
    pub server: Option<String>,

    /// MQTT broker port
    #[arg(short, long, env = "MQTT_PORT")]
    pub port: Option<u16>,

    /// Seconds between device polls
    #[arg(short, long, env = "UPDATE_INTERVAL")]
    pub interval: Option<u64>,

    /// Home Assistant discovery prefix
    #[arg(short, long, env = "TOPIC_PREFIX")]
    pub topic: Option<String>,

    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", value_enum)]
    pub log: Option<LogLevel>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(username) = &self.username {
            config.cloud.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.cloud.password = Some(password.clone());
        }
        if let Some(server) = &self.server {
            config.mqtt.broker = server.clone();
        }
        if let Some(port) = self.port {
            config.mqtt.port = port;
        }
        if let Some(interval) = self.interval {
            config.cloud.update_interval = interval;
        }
        if let Some(topic) = &self.topic {
            config.mqtt.discovery_prefix = topic.clone();
        }
        if let Some(level) = self.log {
            config.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "comfortd", "-c", "/etc/comfortd.toml", "-u", "me@example.com", "-P", "pw", "-s",
            "broker.lan", "-p", "1884", "-i", "90", "-t", "ha", "-l", "debug",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/comfortd.toml")));
        assert_eq!(cli.username.as_deref(), Some("me@example.com"));
        assert_eq!(cli.password.as_deref(), Some("pw"));
        assert_eq!(cli.server.as_deref(), Some("broker.lan"));
        assert_eq!(cli.port, Some(1884));
        assert_eq!(cli.interval, Some(90));
        assert_eq!(cli.topic.as_deref(), Some("ha"));
        assert_eq!(cli.log, Some(LogLevel::Debug));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["comfortd", "--port", "99999"]).is_err());
        assert!(Cli::try_parse_from(["comfortd", "--log", "loud"]).is_err());
        assert!(Cli::try_parse_from(["comfortd", "--interval", "-5"]).is_err());
    }

    #[test]
    fn test_apply_overrides_file_values() {
        let mut config = Config::default();
        config.cloud.username = Some("file-user".to_string());
        config.mqtt.broker = "file-broker".to_string();
        config.mqtt.port = 1999;

        let cli = Cli {
            username: Some("cli-user".to_string()),
            server: Some("cli-broker".to_string()),
            interval: Some(300),
            log: Some(LogLevel::Warn),
            ..Default::default()
        };
        cli.apply(&mut config);

        assert_eq!(config.cloud.username.as_deref(), Some("cli-user"));
        assert_eq!(config.mqtt.broker, "cli-broker");
        assert_eq!(config.mqtt.port, 1999);
        assert_eq!(config.cloud.update_interval, 300);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_apply_nothing() {
        let mut config = Config::default();
        Cli::default().apply(&mut config);

        assert_eq!(config.cloud.username, None);
        assert_eq!(config.mqtt.broker, "localhost");
        assert_eq!(config.mqtt.discovery_prefix, "homeassistant");
    }
}
