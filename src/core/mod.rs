pub mod checkpoint;
pub mod dataset_card;
pub mod etl;
pub mod mapper;
pub mod pipeline;
pub mod translator;

pub use crate::domain::model::{Record, TransformResult, TranslationJob};
pub use crate::domain::ports::{DatasetSink, DatasetSource, Pipeline, Storage, TranslationService};
pub use crate::utils::error::Result;
