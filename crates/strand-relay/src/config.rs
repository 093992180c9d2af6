use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use strand_types::{BackendConfig, ChunkingConfig, LoggingConfig, RelayConfig, ReplyConfig};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub reply: ReplyConfig,
    pub chunking: ChunkingConfig,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
}

/// What the command line session relays and from where
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON topology snapshot (`{"nodes": [...], "edges": [...]}`)
    pub topology_path: PathBuf,
    /// Node whose outbound edges carry each stdin line
    pub source: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            topology_path: PathBuf::from("config/topology.json"),
            source: "user".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, e.g. `STRAND_BACKEND__BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("STRAND")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            backend: self.backend.clone(),
            reply: self.reply.clone(),
            chunking: self.chunking.clone(),
            logging: self.logging.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [backend]
            base_url = "http://127.0.0.1:9000"
            timeout_secs = 30

            [reply]
            default_model = "gpt-4o"
            grace_period_ms = 500

            [logging]
            level = "debug"
            format = "json"

            [session]
            topology_path = "graphs/study.json"
            source = "student"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.reply.default_model, "gpt-4o");
        assert_eq!(config.reply.max_continuation_steps, 5);
        assert_eq!(config.chunking.default_budget, 800);
        assert_eq!(config.session.source, "student");

        let relay = config.relay_config();
        assert_eq!(relay.reply.grace_period_ms, 500);
        assert_eq!(relay.logging.format, "json");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.session.topology_path, PathBuf::from("config/topology.json"));
    }
}
