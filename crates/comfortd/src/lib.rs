pub mod cli;
pub mod climate;
pub mod config;
pub mod mqtt;
pub mod service;

pub use cli::Cli;
pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use service::Service;
