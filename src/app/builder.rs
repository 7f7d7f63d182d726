use crate::adapters::google::GoogleTranslateService;
use crate::adapters::hub::{HubDatasetSink, HubDatasetSource, DEFAULT_HUB_ENDPOINT};
use crate::adapters::local::{FileDatasetSource, LocalDatasetSink};
use crate::adapters::storage::LocalStorage;
use crate::config::toml_config::{SinkConfig, SourceConfig, TomlConfig};
use crate::core::checkpoint::CheckpointManager;
use crate::core::mapper::StructuralMapper;
use crate::core::pipeline::TranslationPipeline;
use crate::core::translator::FieldTranslator;
use crate::domain::model::{PublishRequest, Record};
use crate::domain::ports::{DatasetSink, DatasetSource};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// 依配置選出的資料來源
pub enum ConfiguredSource {
    Hub(HubDatasetSource),
    File(FileDatasetSource<LocalStorage>),
}

#[async_trait]
impl DatasetSource for ConfiguredSource {
    async fn fetch(&self) -> Result<Vec<Record>> {
        match self {
            ConfiguredSource::Hub(source) => source.fetch().await,
            ConfiguredSource::File(source) => source.fetch().await,
        }
    }
}

pub enum ConfiguredSink {
    Hub(HubDatasetSink),
    Local(LocalDatasetSink<LocalStorage>),
}

#[async_trait]
impl DatasetSink for ConfiguredSink {
    async fn publish(&self, records: &[Record], request: &PublishRequest) -> Result<String> {
        match self {
            ConfiguredSink::Hub(sink) => sink.publish(records, request).await,
            ConfiguredSink::Local(sink) => sink.publish(records, request).await,
        }
    }
}

pub type ConfiguredPipeline =
    TranslationPipeline<GoogleTranslateService, ConfiguredSource, ConfiguredSink, LocalStorage>;

pub fn build_source(config: &TomlConfig) -> Result<ConfiguredSource> {
    match &config.source {
        SourceConfig::Hub {
            endpoint,
            repo_id,
            filename,
            revision,
        } => {
            let source = HubDatasetSource::new(
                endpoint.as_deref().unwrap_or(DEFAULT_HUB_ENDPOINT),
                repo_id.as_str(),
                filename.as_str(),
                config.token().map(str::to_string),
                config.request_timeout(),
            )?;
            Ok(ConfiguredSource::Hub(match revision {
                Some(revision) => source.with_revision(revision.as_str()),
                None => source,
            }))
        }
        SourceConfig::File { path } => Ok(ConfiguredSource::File(FileDatasetSource::new(
            LocalStorage::new("."),
            path.as_str(),
        ))),
    }
}

pub fn build_sink(config: &TomlConfig) -> Result<ConfiguredSink> {
    match &config.sink {
        SinkConfig::Hub { endpoint, .. } => {
            let token = config.token().ok_or_else(|| EtlError::MissingConfigError {
                field: "auth.token".to_string(),
            })?;
            Ok(ConfiguredSink::Hub(HubDatasetSink::new(
                endpoint.as_deref().unwrap_or(DEFAULT_HUB_ENDPOINT),
                token,
                config.request_timeout(),
            )?))
        }
        SinkConfig::Local { output_path, .. } => Ok(ConfiguredSink::Local(LocalDatasetSink::new(
            LocalStorage::new(output_path.as_str()),
        ))),
    }
}

pub fn build_pipeline(config: &TomlConfig) -> Result<ConfiguredPipeline> {
    let service = GoogleTranslateService::new(
        config.translation.endpoint.as_str(),
        config.translation.source_language.as_str(),
        config.translation.target_language.as_str(),
        config.request_timeout(),
    )?;
    let mapper = StructuralMapper::new(FieldTranslator::new(service, config.retry_policy()));
    let checkpoints = CheckpointManager::new(LocalStorage::new("."), config.checkpoint.dir.as_str())
        .with_retention(config.checkpoint.keep_last);

    Ok(TranslationPipeline::new(
        build_source(config)?,
        build_sink(config)?,
        mapper,
        checkpoints,
        config.pipeline_settings(),
    ))
}
