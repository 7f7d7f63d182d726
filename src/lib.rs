pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::storage::LocalStorage;
pub use core::{
    checkpoint::CheckpointManager,
    etl::{EtlEngine, PipelineState, RunReport},
    mapper::StructuralMapper,
    pipeline::{PipelineSettings, TranslationPipeline},
    translator::{FieldTranslator, RetryPolicy},
};
pub use domain::model::{Checkpoint, PublishRequest, Record, TranslationJob};
pub use utils::error::{EtlError, Result};
