use crate::core::dataset_card::CardInfo;
use crate::core::pipeline::{PipelineSettings, PublishTarget};
use crate::core::translator::RetryPolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_repo_id, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    pub sink: SinkConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    /// 終端逐筆進度條，預設開啟
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_show_progress() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Hub {
        endpoint: Option<String>,
        repo_id: String,
        filename: String,
        revision: Option<String>,
    },
    File {
        path: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub endpoint: String,
    pub source_language: String,
    pub target_language: String,
    pub language_name: String,
    pub timeout_seconds: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::adapters::google::DEFAULT_ENDPOINT.to_string(),
            source_language: "auto".to_string(),
            target_language: "bn".to_string(),
            language_name: "Bengali".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub rate_limit_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            rate_limit_delay_ms: 500,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub dir: String,
    pub interval: usize,
    pub keep_last: Option<usize>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: "checkpoints".to_string(),
            interval: 100,
            keep_last: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Hub {
        endpoint: Option<String>,
        repo_name: String,
        #[serde(default)]
        private: bool,
        commit_message: Option<String>,
    },
    Local {
        output_path: String,
        repo_name: String,
        commit_message: Option<String>,
    },
}

impl SinkConfig {
    pub fn repo_name(&self) -> &str {
        match self {
            SinkConfig::Hub { repo_name, .. } | SinkConfig::Local { repo_name, .. } => repo_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HF_TOKEN})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// token 為空或仍是未替換的 `${VAR}` 時視為未設定
    pub fn token(&self) -> Option<&str> {
        self.auth
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty() && !t.starts_with("${"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.translation.timeout_seconds)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn source_dataset(&self) -> String {
        match &self.source {
            SourceConfig::Hub { repo_id, .. } => repo_id.clone(),
            SourceConfig::File { path } => path.clone(),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let (repo_name, private, commit_message) = match &self.sink {
            SinkConfig::Hub {
                repo_name,
                private,
                commit_message,
                ..
            } => (repo_name, *private, commit_message),
            SinkConfig::Local {
                repo_name,
                commit_message,
                ..
            } => (repo_name, false, commit_message),
        };

        PipelineSettings {
            checkpoint_interval: self.checkpoint.interval,
            show_progress: self.pipeline.show_progress,
            publish: PublishTarget {
                repo_name: repo_name.clone(),
                private,
                commit_message: commit_message.clone().unwrap_or_else(|| {
                    format!(
                        "Add {} translation of {}",
                        self.translation.language_name,
                        self.source_dataset()
                    )
                }),
            },
            card: CardInfo {
                language_name: self.translation.language_name.clone(),
                language_code: self.translation.target_language.clone(),
                source_dataset: self.source_dataset(),
                translator_name: "Google Translate".to_string(),
            },
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        match &self.source {
            SourceConfig::Hub {
                endpoint,
                repo_id,
                filename,
                ..
            } => {
                if let Some(endpoint) = endpoint {
                    validate_url("source.endpoint", endpoint)?;
                }
                validate_repo_id("source.repo_id", repo_id)?;
                validate_path("source.filename", filename)?;
            }
            SourceConfig::File { path } => validate_path("source.path", path)?,
        }

        validate_url("translation.endpoint", &self.translation.endpoint)?;
        validate_non_empty_string("translation.target_language", &self.translation.target_language)?;
        validate_range("translation.timeout_seconds", self.translation.timeout_seconds, 1, 600)?;

        validate_positive_number("retry.max_retries", self.retry.max_retries as usize, 1)?;
        validate_range("retry.retry_delay_ms", self.retry.retry_delay_ms, 0, 600_000)?;
        validate_range("retry.rate_limit_delay_ms", self.retry.rate_limit_delay_ms, 0, 600_000)?;

        validate_path("checkpoint.dir", &self.checkpoint.dir)?;
        validate_positive_number("checkpoint.interval", self.checkpoint.interval, 1)?;
        if let Some(keep_last) = self.checkpoint.keep_last {
            validate_positive_number("checkpoint.keep_last", keep_last, 1)?;
        }

        match &self.sink {
            SinkConfig::Hub {
                endpoint,
                repo_name,
                ..
            } => {
                if let Some(endpoint) = endpoint {
                    validate_url("sink.endpoint", endpoint)?;
                }
                validate_repo_id("sink.repo_name", repo_name)?;
                // 發布到 Hub 需要寫入權限
                validate_required_field("auth.token", &self.token())?;
            }
            SinkConfig::Local {
                output_path,
                repo_name,
                ..
            } => {
                validate_path("sink.output_path", output_path)?;
                validate_repo_id("sink.repo_name", repo_name)?;
            }
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HUB_CONFIG: &str = r#"
[pipeline]
name = "bengali-morehopqa"

[auth]
token = "hf_test"

[source]
type = "hub"
repo_id = "alabnii/morehopqa"
filename = "data/with_human_verification.json"

[retry]
max_retries = 5
retry_delay_ms = 100

[checkpoint]
dir = "./checkpoints"
interval = 50
keep_last = 3

[sink]
type = "hub"
repo_name = "me/bengali-morehopqa"
private = true
"#;

    #[test]
    fn test_parse_hub_config_with_defaults() {
        let config = TomlConfig::from_toml_str(HUB_CONFIG).unwrap();

        assert_eq!(config.pipeline.name, "bengali-morehopqa");
        assert!(matches!(config.source, SourceConfig::Hub { .. }));
        assert_eq!(config.translation.target_language, "bn");
        assert_eq!(config.retry.rate_limit_delay_ms, 500);
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                max_retries: 5,
                retry_delay: Duration::from_millis(100),
                rate_limit_delay: Duration::from_millis(500),
            }
        );
        assert_eq!(config.checkpoint.keep_last, Some(3));
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_settings_from_config() {
        let config = TomlConfig::from_toml_str(HUB_CONFIG).unwrap();
        let settings = config.pipeline_settings();

        assert_eq!(settings.checkpoint_interval, 50);
        assert_eq!(settings.publish.repo_name, "me/bengali-morehopqa");
        assert!(settings.publish.private);
        assert_eq!(
            settings.publish.commit_message,
            "Add Bengali translation of alabnii/morehopqa"
        );
        assert_eq!(settings.card.source_dataset, "alabnii/morehopqa");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HOPQA_TEST_TOKEN", "hf_from_env");

        let config = TomlConfig::from_toml_str(
            &HUB_CONFIG.replace("\"hf_test\"", "\"${HOPQA_TEST_TOKEN}\""),
        )
        .unwrap();
        assert_eq!(config.token(), Some("hf_from_env"));

        std::env::remove_var("HOPQA_TEST_TOKEN");
    }

    #[test]
    fn test_unset_token_fails_hub_sink_validation() {
        let config = TomlConfig::from_toml_str(
            &HUB_CONFIG.replace("\"hf_test\"", "\"${HOPQA_TEST_UNSET_TOKEN}\""),
        )
        .unwrap();

        assert_eq!(config.token(), None);
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = TomlConfig::from_toml_str(
            &HUB_CONFIG.replace("max_retries = 5", "max_retries = 0"),
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[pipeline]
name = "offline"

[source]
type = "file"
path = "input.json"

[sink]
type = "local"
output_path = "./output"
repo_name = "bengali-morehopqa"

[monitoring]
enabled = true
"#;
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();

        assert!(matches!(config.sink, SinkConfig::Local { .. }));
        assert_eq!(config.checkpoint.interval, 100);
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_source_type_rejected() {
        let content = HUB_CONFIG.replace("type = \"hub\"\nrepo_id", "type = \"s3\"\nrepo_id");
        assert!(TomlConfig::from_toml_str(&content).is_err());
    }
}
