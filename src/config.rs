use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment override for the case-store directory.
pub const ENV_CASE_STORE: &str = "CASEPACK_CASE_STORE";
/// Environment override for the checkpoint database path.
pub const ENV_CHECKPOINT_DB: &str = "CASEPACK_CHECKPOINT_DB";
/// Environment override for the batch size.
pub const ENV_BATCH_SIZE: &str = "CASEPACK_BATCH_SIZE";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub support_api: SupportApiConfig,
    pub case_store: CaseStoreConfig,
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: Option<QueryConfig>,
}

/// Upstream support API settings. The bearer token is read from the
/// `SUPPORT_API_TOKEN` environment variable, not from the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct SupportApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseStoreConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckpointConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Cases written per artifact file.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Downstream retrieval+generation query service (external collaborator).
#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Recognized environment overrides: case-store location, checkpoint-store
/// location, and batch size. These take precedence over the config file so a
/// scheduler can retarget a run without editing TOML.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(dir) = std::env::var(ENV_CASE_STORE) {
        config.case_store.dir = PathBuf::from(dir);
    }
    if let Ok(path) = std::env::var(ENV_CHECKPOINT_DB) {
        config.checkpoint.db_path = PathBuf::from(path);
    }
    if let Ok(raw) = std::env::var(ENV_BATCH_SIZE) {
        config.ingest.batch_size = raw
            .parse()
            .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_BATCH_SIZE, raw))?;
    }
    Ok(())
}

/// Effective cases-per-artifact count: a CLI override wins over the
/// configured value, and is rejected when zero the same way `validate`
/// rejects a zero configured value.
pub fn effective_batch_size(config: &Config, override_size: Option<usize>) -> Result<usize> {
    match override_size {
        Some(0) => anyhow::bail!("batch size must be > 0"),
        Some(n) => Ok(n),
        None => Ok(config.ingest.batch_size),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.support_api.base_url.trim().is_empty() {
        anyhow::bail!("support_api.base_url must not be empty");
    }
    if config.ingest.batch_size == 0 {
        anyhow::bail!("ingest.batch_size must be > 0");
    }
    if config.support_api.request_timeout_secs == 0 {
        anyhow::bail!("support_api.request_timeout_secs must be > 0");
    }
    if let Some(query) = &config.query {
        if query.endpoint.trim().is_empty() {
            anyhow::bail!("query.endpoint must not be empty when [query] is present");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Bypasses env overrides so parallel tests cannot race on process-wide
    // variables.
    fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(
            r#"
            [support_api]
            base_url = "https://support.example.com"

            [case_store]
            dir = "/var/lib/casepack/cases"

            [checkpoint]
            db_path = "/var/lib/casepack/checkpoint.sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.batch_size, 10);
        assert_eq!(config.support_api.request_timeout_secs, 30);
        assert!(config.query.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [support_api]
            base_url = "https://support.example.com"
            request_timeout_secs = 10

            [case_store]
            dir = "./cases"

            [checkpoint]
            db_path = "./checkpoint.sqlite"

            [ingest]
            batch_size = 25

            [query]
            endpoint = "https://kb.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.batch_size, 25);
        assert_eq!(config.support_api.request_timeout_secs, 10);
        assert_eq!(config.query.unwrap().endpoint, "https://kb.example.com");
    }

    #[test]
    fn test_effective_batch_size() {
        let config = parse(
            r#"
            [support_api]
            base_url = "https://support.example.com"

            [case_store]
            dir = "./cases"

            [checkpoint]
            db_path = "./checkpoint.sqlite"

            [ingest]
            batch_size = 10
            "#,
        )
        .unwrap();

        assert_eq!(effective_batch_size(&config, None).unwrap(), 10);
        assert_eq!(effective_batch_size(&config, Some(3)).unwrap(), 3);
        // A zero override is as invalid as a zero configured value.
        assert!(effective_batch_size(&config, Some(0)).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = parse(
            r#"
            [support_api]
            base_url = "https://support.example.com"

            [case_store]
            dir = "./cases"

            [checkpoint]
            db_path = "./checkpoint.sqlite"

            [ingest]
            batch_size = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let err = parse(
            r#"
            [support_api]
            base_url = ""

            [case_store]
            dir = "./cases"

            [checkpoint]
            db_path = "./checkpoint.sqlite"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
