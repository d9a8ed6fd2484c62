use crate::domain::error::Result;
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_FILE: &str = "reqpilot.toml";
pub const ENV_PREFIX: &str = "REQPILOT_";
const KEYRING_SERVICE: &str = "reqpilot";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Bytes read per progress update.
    pub chunk_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LLMConfig,
    pub http: HttpConfig,
    pub ingestion: IngestionConfig,
}

impl AppConfig {
    /// Defaults, then `reqpilot.toml`, then `REQPILOT_*` variables
    /// (`REQPILOT_LLM__MODEL=...`).
    pub fn load() -> Result<Self> {
        Ok(Self::figment(CONFIG_FILE).extract()?)
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    /// Fills in the API key from the OS keyring when the configuration
    /// does not carry one.
    pub fn resolve_llm_config(&self, config: &LLMConfig) -> LLMConfig {
        let mut resolved = config.clone();
        if resolved.api_key.is_some() || resolved.provider == LLMProvider::Local {
            return resolved;
        }

        match self.keyring.get_secret(resolved.provider.key_name()) {
            Ok(Some(key)) => resolved.api_key = Some(key),
            Ok(None) => warn!(provider = %resolved.provider, "No API key configured"),
            Err(e) => warn!(error = %e, provider = %resolved.provider, "Keyring lookup failed"),
        }
        resolved
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        figment::Jail::expect_with(|_jail| {
            let config: AppConfig = AppConfig::figment(CONFIG_FILE).extract()?;
            assert_eq!(config.http.port, 3001);
            assert_eq!(config.llm.provider, LLMProvider::Local);
            assert_eq!(config.ingestion.chunk_size, 16 * 1024);
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [llm]
                provider = "Gemini"
                base_url = "https://generativelanguage.googleapis.com/v1beta"
                model = "gemini-1.5-flash"

                [http]
                port = 4000
                "#,
            )?;
            jail.set_env("REQPILOT_HTTP__PORT", "4100");

            let config: AppConfig = AppConfig::figment(CONFIG_FILE).extract()?;
            assert_eq!(config.llm.provider, LLMProvider::Gemini);
            assert_eq!(config.llm.model, "gemini-1.5-flash");
            assert_eq!(config.http.port, 4100);
            assert_eq!(config.http.host, "127.0.0.1");
            Ok(())
        });
    }

    #[test]
    fn test_local_provider_skips_keyring() {
        let service = ConfigService::new();
        let resolved = service.resolve_llm_config(&LLMConfig::default());
        assert!(resolved.api_key.is_none());
    }
}
