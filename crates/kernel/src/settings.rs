use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "SHELF";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from `config_dir` for the named environment.
    ///
    /// Layers `base.toml`, then `{environment}.toml`, then `SHELF_*` variables where
    /// `__` separates nested keys (`SHELF_SERVER__PORT=9090`).
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The environment selector wins over anything set in the files.
        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Path prefix every module is mounted under; empty mounts at the root.
    #[serde(default)]
    pub api_prefix: String,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// Bind address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            api_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// Logical database holding the `books` and `rentals` collections.
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    /// JSON snapshot loaded at startup and written at shutdown.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl DatabaseSettings {
    fn default_name() -> String {
        "BookRental".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "TelemetrySettings::default_log_filter")]
    pub log_filter: String,
}

impl TelemetrySettings {
    fn default_log_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_filter: Self::default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_is_book_rental_without_snapshot() {
        let settings = Settings::default();
        assert_eq!(settings.database.name, "BookRental");
        assert!(settings.database.snapshot_path.is_none());
    }

    #[test]
    fn default_server_mounts_at_root() {
        let settings = Settings::default();
        assert_eq!(settings.server.api_prefix, "");
        assert_eq!(settings.server.address(), "0.0.0.0:8080");
    }

    #[test]
    fn environment_overlay_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[server]\nport = 9000\nhost = \"127.0.0.1\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[server]\nport = 9100\n[database]\nsnapshot_path = \"data/shelf.json\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), "staging").unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(
            settings.database.snapshot_path,
            Some(PathBuf::from("data/shelf.json"))
        );
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path(), "production").unwrap();
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load_from(dir.path(), "qa").is_err());
    }
}
