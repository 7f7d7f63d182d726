use crate::config::toml_config::{SinkConfig, TomlConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "hopqa-translate")]
#[command(about = "Translate a multi-hop QA dataset with checkpointed, resumable runs")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "translate.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Override checkpoint directory from config
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    /// Override checkpoint interval from config
    #[arg(long)]
    pub checkpoint_interval: Option<usize>,

    /// Override target repository name from config
    #[arg(long)]
    pub repo_name: Option<String>,

    /// Hide the per-record progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// 將命令列覆蓋套用到 TOML 配置
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(dir) = &self.checkpoint_dir {
            tracing::info!("🔧 Checkpoint directory overridden to: {}", dir);
            config.checkpoint.dir = dir.clone();
        }

        if let Some(interval) = self.checkpoint_interval {
            tracing::info!("🔧 Checkpoint interval overridden to: {}", interval);
            config.checkpoint.interval = interval;
        }

        if let Some(name) = &self.repo_name {
            tracing::info!("🔧 Target repository overridden to: {}", name);
            match &mut config.sink {
                SinkConfig::Hub { repo_name, .. } | SinkConfig::Local { repo_name, .. } => {
                    *repo_name = name.clone();
                }
            }
        }

        // JSON 日誌給機器讀，不與進度條混在一起
        if self.no_progress || self.json_logs {
            config.pipeline.show_progress = false;
        }

        if let Some(monitor) = self.monitor {
            config.monitoring = Some(crate::config::toml_config::MonitoringConfig { enabled: monitor });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[pipeline]
name = "offline"

[source]
type = "file"
path = "input.json"

[sink]
type = "local"
output_path = "./output"
repo_name = "bengali-morehopqa"
"#;

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = CliConfig::parse_from([
            "hopqa-translate",
            "--checkpoint-dir",
            "/tmp/ckpt",
            "--checkpoint-interval",
            "25",
            "--repo-name",
            "bengali-morehopqa-v2",
            "--monitor",
            "true",
            "--no-progress",
        ]);
        let mut config = TomlConfig::from_toml_str(CONFIG).unwrap();

        cli.apply_overrides(&mut config);

        assert_eq!(config.checkpoint.dir, "/tmp/ckpt");
        assert_eq!(config.checkpoint.interval, 25);
        assert_eq!(config.sink.repo_name(), "bengali-morehopqa-v2");
        assert!(config.monitoring_enabled());
        assert!(!config.pipeline_settings().show_progress);
    }

    #[test]
    fn test_json_logs_hide_progress_bar() {
        let cli = CliConfig::parse_from(["hopqa-translate", "--json-logs"]);
        let mut config = TomlConfig::from_toml_str(CONFIG).unwrap();
        assert!(config.pipeline.show_progress);

        cli.apply_overrides(&mut config);

        assert!(!config.pipeline.show_progress);
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = CliConfig::parse_from(["hopqa-translate"]);
        let mut config = TomlConfig::from_toml_str(CONFIG).unwrap();

        cli.apply_overrides(&mut config);

        assert_eq!(cli.config, "translate.toml");
        assert_eq!(config.checkpoint.dir, "checkpoints");
        assert!(!config.monitoring_enabled());
        assert!(config.pipeline_settings().show_progress);
    }
}
